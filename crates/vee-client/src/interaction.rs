//! # Interaction Toggle
//!
//! A user-to-post boolean relationship ("like", "bookmark") backed by a join
//! record in the store. The visible state only changes once the store has
//! answered; a failed call leaves it exactly as it was.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::json;
use tokio::task::JoinHandle;
use vee_core::{
    records, AppError, Expand, Filter, Interaction, InteractionKind, ListQuery, NotificationKind,
    Post, Result,
};

use crate::notify::NotificationDraft;
use crate::Context;

/// The "disabled button": held for the duration of one activation.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| AppError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleState {
    /// Id of the backing interaction record; present exactly when active.
    pub interaction_id: Option<String>,
    /// Visible counter; only like toggles carry one.
    pub count: Option<u64>,
}

impl ToggleState {
    pub fn active(&self) -> bool {
        self.interaction_id.is_some()
    }
}

/// Result of a successful toggle.
#[derive(Debug)]
pub struct ToggleOutcome {
    pub state: ToggleState,
    /// The detached notification task, when one was dispatched.
    pub notification: Option<JoinHandle<()>>,
}

pub struct InteractionToggle {
    ctx: Context,
    kind: InteractionKind,
    post_id: String,
    post_author: String,
    state: Mutex<ToggleState>,
    in_flight: AtomicBool,
}

impl InteractionToggle {
    /// Looks up the viewer's interaction and, for likes, the like count.
    /// Lookup failures are logged and leave the toggle inactive or the
    /// count at zero.
    pub async fn load(ctx: &Context, post: &Post, kind: InteractionKind) -> Self {
        let user_id = ctx.session.user_id();
        let mine = Filter::eq("post", &post.id)
            .and(Filter::eq("user", &user_id))
            .and(Filter::eq("type", kind.as_str()));

        let interactions = records::<Interaction>(ctx.store());
        let lookup = interactions.find_first(&mine);
        let count = async {
            match kind {
                InteractionKind::Like => Some(like_count(ctx, &post.id).await),
                _ => None,
            }
        };
        let (found, count) = tokio::join!(lookup, count);

        let interaction_id = match found {
            Ok(found) => found.map(|interaction| interaction.id),
            Err(err) => {
                tracing::warn!(error = %err, post = %post.id, kind = kind.as_str(), "interaction lookup failed");
                None
            }
        };

        Self::with_state(ctx, post, kind, ToggleState { interaction_id, count })
    }

    /// A toggle for a post that was just created: nobody can have
    /// interacted with it yet, so no lookups are made.
    pub fn fresh(ctx: &Context, post: &Post, kind: InteractionKind) -> Self {
        let count = (kind == InteractionKind::Like).then_some(0);
        Self::with_state(ctx, post, kind, ToggleState { interaction_id: None, count })
    }

    fn with_state(ctx: &Context, post: &Post, kind: InteractionKind, state: ToggleState) -> Self {
        Self {
            ctx: ctx.clone(),
            kind,
            post_id: post.id.clone(),
            post_author: post.author.clone(),
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ToggleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> ToggleState {
        self.lock().clone()
    }

    pub fn kind(&self) -> InteractionKind {
        self.kind
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Flips the relationship. Returns `AppError::Busy` while a previous
    /// activation is still in flight.
    pub async fn toggle(&self) -> Result<ToggleOutcome> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let current = self.state();

        match current.interaction_id {
            Some(id) => self.remove(&id).await,
            None => self.add().await,
        }
    }

    async fn remove(&self, interaction_id: &str) -> Result<ToggleOutcome> {
        if let Err(err) = records::<Interaction>(self.ctx.store()).delete(interaction_id).await {
            tracing::warn!(error = %err, post = %self.post_id, kind = self.kind.as_str(), "failed to remove interaction");
            return Err(err);
        }

        let mut state = self.lock();
        state.interaction_id = None;
        state.count = state.count.map(|n| n.saturating_sub(1));
        Ok(ToggleOutcome { state: state.clone(), notification: None })
    }

    async fn add(&self) -> Result<ToggleOutcome> {
        let user_id = self.ctx.session.user_id();
        let fields = json!({ "user": user_id, "post": self.post_id, "type": self.kind });

        let created = match records::<Interaction>(self.ctx.store()).create(fields, &Expand::none()).await {
            Ok(created) => created,
            Err(err) => {
                tracing::warn!(error = %err, post = %self.post_id, kind = self.kind.as_str(), "failed to add interaction");
                return Err(err);
            }
        };

        let state = {
            let mut state = self.lock();
            state.interaction_id = Some(created.id);
            state.count = state.count.map(|n| n + 1);
            state.clone()
        };

        let notification = match self.kind {
            InteractionKind::Like => self.ctx.notifier.dispatch(NotificationDraft {
                recipient: self.post_author.clone(),
                kind: NotificationKind::Like,
                source_user: user_id,
                post: Some(self.post_id.clone()),
            }),
            _ => None,
        };

        Ok(ToggleOutcome { state, notification })
    }
}

async fn like_count(ctx: &Context, post_id: &str) -> u64 {
    let query = ListQuery::new()
        .filter(Filter::eq("post", post_id).and(Filter::eq("type", InteractionKind::Like.as_str())))
        .page(1, 1);

    match records::<Interaction>(ctx.store()).list(&query).await {
        Ok(page) => page.total,
        Err(err) => {
            tracing::warn!(error = %err, post = %post_id, "failed to count likes");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Notify;
    use vee_core::{collections, MockRecordStore, Page, RecordStore, Session, User};
    use vee_ui::TemplateRegistry;

    fn ctx(store: MockRecordStore) -> Context {
        let viewer = User { id: "me".into(), username: "me".into(), ..Default::default() };
        Context::new(Arc::new(store), Session::new(viewer), TemplateRegistry::default())
    }

    fn post(author: &str) -> Post {
        Post { id: "p1".into(), author: author.into(), content: "hi".into(), ..Default::default() }
    }

    /// Holds every create until the gate opens, then defers to the mock.
    struct Gated {
        inner: MockRecordStore,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl RecordStore for Gated {
        async fn list(&self, collection: &str, query: &ListQuery) -> Result<Page<Value>> {
            self.inner.list(collection, query).await
        }

        async fn get_one(&self, collection: &str, id: &str, expand: &Expand) -> Result<Value> {
            self.inner.get_one(collection, id, expand).await
        }

        async fn get_first_matching(&self, collection: &str, filter: &Filter) -> Result<Value> {
            self.inner.get_first_matching(collection, filter).await
        }

        async fn create(&self, collection: &str, fields: Value, expand: &Expand) -> Result<Value> {
            self.gate.notified().await;
            self.inner.create(collection, fields, expand).await
        }

        async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Value> {
            self.inner.update(collection, id, fields).await
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<()> {
            self.inner.delete(collection, id).await
        }
    }

    fn unliked(store: &mut MockRecordStore, total: u64) {
        store
            .expect_get_first_matching()
            .returning(|_, filter| Err(AppError::not_found("interactions", filter.to_string())));
        store
            .expect_list()
            .returning(move |_, _| Ok(Page { items: vec![], total }));
    }

    #[tokio::test]
    async fn test_load_finds_existing_like() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_first_matching()
            .withf(|collection, filter| {
                collection == collections::INTERACTIONS
                    && filter.to_string() == r#"post = "p1" && user = "me" && type = "like""#
            })
            .returning(|_, _| Ok(json!({ "id": "i9", "user": "me", "post": "p1", "type": "like" })));
        store.expect_list().returning(|_, _| Ok(Page { items: vec![], total: 4 }));

        let toggle = InteractionToggle::load(&ctx(store), &post("u2"), InteractionKind::Like).await;
        let state = toggle.state();
        assert!(state.active());
        assert_eq!(state.interaction_id.as_deref(), Some("i9"));
        assert_eq!(state.count, Some(4));
    }

    #[tokio::test]
    async fn test_lookup_failure_loads_inactive() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_first_matching()
            .returning(|_, _| Err(AppError::Transport("offline".into())));

        let toggle = InteractionToggle::load(&ctx(store), &post("u2"), InteractionKind::Bookmark).await;
        assert_eq!(toggle.state(), ToggleState::default());
    }

    #[tokio::test]
    async fn test_like_then_unlike_returns_to_start() {
        let mut store = MockRecordStore::new();
        unliked(&mut store, 3);
        store
            .expect_create()
            .withf(|collection, _, _| collection == collections::INTERACTIONS)
            .times(1)
            .returning(|_, fields, _| {
                let mut record = fields;
                record["id"] = Value::from("i1");
                Ok(record)
            });
        store
            .expect_create()
            .withf(|collection, _, _| collection == collections::NOTIFICATIONS)
            .times(1)
            .returning(|_, fields, _| Ok(fields));
        store
            .expect_delete()
            .withf(|collection, id| collection == collections::INTERACTIONS && id == "i1")
            .times(1)
            .returning(|_, _| Ok(()));

        let toggle = InteractionToggle::load(&ctx(store), &post("u2"), InteractionKind::Like).await;
        let before = toggle.state();

        let liked = toggle.toggle().await.unwrap();
        assert!(liked.state.active());
        assert_eq!(liked.state.count, Some(4));
        liked.notification.expect("like notifies the author").await.unwrap();

        let unliked = toggle.toggle().await.unwrap();
        assert_eq!(unliked.state, before);
        assert!(unliked.notification.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_activations_reach_the_store_once() {
        let mut inner = MockRecordStore::new();
        inner
            .expect_create()
            .withf(|collection, _, _| collection == collections::INTERACTIONS)
            .times(1)
            .returning(|_, mut fields, _| {
                fields["id"] = Value::from("i1");
                Ok(fields)
            });
        let gate = Arc::new(Notify::new());
        let viewer = User { id: "me".into(), username: "me".into(), ..Default::default() };
        let ctx = Context::new(
            Arc::new(Gated { inner, gate: gate.clone() }),
            Session::new(viewer),
            TemplateRegistry::default(),
        );
        let toggle = InteractionToggle::fresh(&ctx, &post("u2"), InteractionKind::Bookmark);

        let second = async {
            let result = toggle.toggle().await;
            gate.notify_one();
            result
        };
        let (first, second) = tokio::join!(toggle.toggle(), second);

        assert!(first.unwrap().state.active());
        assert_eq!(second.unwrap_err(), AppError::Busy);
        assert!(!toggle.is_busy());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_state() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_first_matching()
            .returning(|_, _| Ok(json!({ "id": "i1", "user": "me", "post": "p1", "type": "like" })));
        store.expect_list().returning(|_, _| Ok(Page { items: vec![], total: 2 }));
        store
            .expect_delete()
            .returning(|_, _| Err(AppError::Store { status: 500, message: "boom".into() }));

        let toggle = InteractionToggle::load(&ctx(store), &post("u2"), InteractionKind::Like).await;
        assert!(toggle.toggle().await.is_err());

        let state = toggle.state();
        assert!(state.active());
        assert_eq!(state.count, Some(2));
        assert!(!toggle.is_busy());
    }

    #[tokio::test]
    async fn test_failed_create_stays_inactive() {
        let mut store = MockRecordStore::new();
        unliked(&mut store, 0);
        store
            .expect_create()
            .times(1)
            .returning(|_, _, _| Err(AppError::Transport("offline".into())));

        let toggle = InteractionToggle::load(&ctx(store), &post("u2"), InteractionKind::Like).await;
        assert!(toggle.toggle().await.is_err());
        assert!(!toggle.state().active());
        assert_eq!(toggle.state().count, Some(0));
    }

    #[tokio::test]
    async fn test_liking_own_post_sends_no_notification() {
        let mut store = MockRecordStore::new();
        store
            .expect_create()
            .withf(|collection, _, _| collection == collections::INTERACTIONS)
            .times(1)
            .returning(|_, mut fields, _| {
                fields["id"] = Value::from("i1");
                Ok(fields)
            });

        let ctx = ctx(store);
        let toggle = InteractionToggle::fresh(&ctx, &post("me"), InteractionKind::Like);
        let outcome = toggle.toggle().await.unwrap();
        assert_eq!(outcome.state.count, Some(1));
        assert!(outcome.notification.is_none());
    }

    #[tokio::test]
    async fn test_bookmark_never_notifies() {
        let mut store = MockRecordStore::new();
        store.expect_create().times(1).returning(|_, mut fields, _| {
            fields["id"] = Value::from("b1");
            Ok(fields)
        });

        let toggle = InteractionToggle::fresh(&ctx(store), &post("u2"), InteractionKind::Bookmark);
        let outcome = toggle.toggle().await.unwrap();
        assert!(outcome.state.active());
        assert_eq!(outcome.state.count, None);
        assert!(outcome.notification.is_none());
    }

    #[test]
    fn test_in_flight_rejects_second_activation() {
        let flag = AtomicBool::new(false);
        let first = InFlight::acquire(&flag).unwrap();
        assert_eq!(InFlight::acquire(&flag).err(), Some(AppError::Busy));
        drop(first);
        assert!(InFlight::acquire(&flag).is_ok());
    }
}
