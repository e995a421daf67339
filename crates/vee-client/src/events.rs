//! # New-post Signal
//!
//! Synchronous broadcast: `emit` calls every listener attached at that
//! moment, on the emitting task, before returning. Nothing is queued, so a
//! listener attached later never sees earlier posts.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use vee_core::Post;

type Listener = Arc<dyn Fn(&Post) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone, Default)]
pub struct NewPostSignal {
    listeners: Arc<Mutex<Listeners>>,
}

impl NewPostSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a listener until the returned guard is dropped.
    #[must_use = "the listener is detached when the subscription is dropped"]
    pub fn subscribe(&self, listener: impl Fn(&Post) + Send + Sync + 'static) -> Subscription {
        let mut guard = lock(&self.listeners);
        let id = guard.next_id;
        guard.next_id += 1;
        guard.entries.push((id, Arc::new(listener)));

        Subscription { listeners: Arc::downgrade(&self.listeners), id }
    }

    /// Delivers `post` to every attached listener; returns how many saw it.
    pub fn emit(&self, post: &Post) -> usize {
        // Snapshot first so listeners may (un)subscribe while being called.
        let listeners: Vec<Listener> =
            lock(&self.listeners).entries.iter().map(|(_, l)| l.clone()).collect();
        for listener in &listeners {
            listener(post);
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }
}

/// Detaches its listener on drop.
pub struct Subscription {
    listeners: Weak<Mutex<Listeners>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).entries.retain(|(id, _)| *id != self.id);
        }
    }
}
