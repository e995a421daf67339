//! Best-effort notifications.
//!
//! Each notification is created on its own detached task. The caller never
//! awaits it and its failure only reaches the log.

use std::sync::Arc;

use serde_json::json;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use vee_core::{collections, Expand, NotificationKind, RecordStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub recipient: String,
    pub kind: NotificationKind,
    pub source_user: String,
    pub post: Option<String>,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn RecordStore>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Spawns the create call. Returns `None` when nothing was sent: the
    /// recipient is the acting user, or there is no runtime to spawn on.
    /// The handle is informational; dropping it does not cancel the task.
    pub fn dispatch(&self, draft: NotificationDraft) -> Option<JoinHandle<()>> {
        if draft.recipient == draft.source_user {
            return None;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(kind = draft.kind.as_str(), "no runtime, notification dropped");
            return None;
        };

        let store = self.store.clone();
        Some(runtime.spawn(async move {
            let fields = json!({
                "user": draft.recipient,
                "type": draft.kind,
                "source_user": draft.source_user,
                "post": draft.post.clone().unwrap_or_default(),
                "read": false,
            });
            if let Err(err) = store.create(collections::NOTIFICATIONS, fields, &Expand::none()).await {
                tracing::warn!(
                    error = %err,
                    kind = draft.kind.as_str(),
                    recipient = %draft.recipient,
                    "failed to create notification"
                );
            }
        }))
    }
}
