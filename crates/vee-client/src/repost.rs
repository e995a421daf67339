//! # Repost Composer
//!
//! One surface, one draft. Every `open` starts a new draft for the given
//! target, so nothing from an earlier invocation carries over.

use serde_json::json;
use tokio::task::JoinHandle;
use vee_core::{records, validation, AppError, Expand, NotificationKind, Post, Result};
use vee_ui::RepostSurfaceView;

use crate::notify::NotificationDraft;
use crate::post_card::PostCardBuilder;
use crate::Context;

const REPOST_FAILED: &str = "Failed to repost. Please try again.";

#[derive(Debug, Clone)]
struct Draft {
    /// Id stored in the new post's `original_post`
    target_id: String,
    /// Shown in the embedded preview
    preview: Post,
    /// Author of the target, when the target record carries it
    target_author: Option<String>,
    text: String,
    error: Option<String>,
    submitting: bool,
}

#[derive(Debug)]
pub struct RepostOutcome {
    pub post: Post,
    /// The detached notification to the original's author, when one was sent.
    pub notification: Option<JoinHandle<()>>,
}

pub struct RepostComposer {
    ctx: Context,
    cards: PostCardBuilder,
    draft: Option<Draft>,
}

impl RepostComposer {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone(), cards: PostCardBuilder::new(ctx), draft: None }
    }

    /// Opens the surface for `target`, replacing any open draft. Reposting
    /// a repost targets its original.
    pub fn open(&mut self, target: &Post) {
        let target_id = target.original_post.clone().unwrap_or_else(|| target.id.clone());
        let (preview, target_author) = match (target.is_repost(), target.original()) {
            (_, Some(original)) => (original.clone(), Some(original.author.clone())),
            (false, None) => (target.clone(), Some(target.author.clone())),
            (true, None) => (target.clone(), None),
        };
        self.draft = Some(Draft {
            target_id,
            preview,
            target_author,
            text: String::new(),
            error: None,
            submitting: false,
        });
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn target_id(&self) -> Option<&str> {
        self.draft.as_ref().map(|draft| draft.target_id.as_str())
    }

    pub fn error(&self) -> Option<&str> {
        self.draft.as_ref().and_then(|draft| draft.error.as_deref())
    }

    pub fn set_text(&mut self, text: &str) {
        if let Some(draft) = self.draft.as_mut() {
            draft.text = text.to_string();
        }
    }

    /// Closes the surface without touching the store.
    pub fn cancel(&mut self) {
        self.draft = None;
    }

    /// The surface markup, or `None` while closed.
    pub fn render(&self) -> Result<Option<String>> {
        let Some(draft) = &self.draft else {
            return Ok(None);
        };
        let preview_html = self.cards.build_embedded(&draft.preview).html()?;
        self.ctx
            .templates
            .render(&RepostSurfaceView {
                preview_html,
                text: draft.text.clone(),
                error: draft.error.clone(),
                submitting: draft.submitting,
            })
            .map(Some)
    }

    /// Creates the repost. On success the surface closes and the new post,
    /// expanded down to the original's author, is emitted on the new-post
    /// signal and the original's author is notified. On failure the surface
    /// stays open with an inline error.
    pub async fn confirm(&mut self) -> Result<RepostOutcome> {
        let Some(draft) = self.draft.as_mut() else {
            return Err(AppError::validation("Nothing to repost."));
        };
        let comment = match validation::repost_comment(draft.text.trim()) {
            Ok(comment) => comment,
            Err(err) => {
                draft.error = Some(err.user_message());
                return Err(err);
            }
        };
        draft.submitting = true;
        draft.error = None;

        let fields = json!({
            "author": self.ctx.session.user_id(),
            "content": comment,
            "original_post": draft.target_id,
        });
        let created = records::<Post>(self.ctx.store())
            .create(fields, &Expand::post_with_original())
            .await;

        match created {
            Ok(post) => {
                let notification = self.draft.take().and_then(|draft| {
                    let recipient = draft.target_author.filter(|author| !author.is_empty())?;
                    self.ctx.notifier.dispatch(NotificationDraft {
                        recipient,
                        kind: NotificationKind::Repost,
                        source_user: self.ctx.session.user_id(),
                        post: Some(draft.target_id),
                    })
                });
                self.ctx.new_posts.emit(&post);
                Ok(RepostOutcome { post, notification })
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to repost");
                if let Some(draft) = self.draft.as_mut() {
                    draft.submitting = false;
                    draft.error = Some(REPOST_FAILED.to_string());
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use serde_json::Value;
    use vee_core::{collections, MockRecordStore, PostExpand, Session, User};
    use vee_ui::TemplateRegistry;

    fn ctx(store: MockRecordStore) -> Context {
        let viewer = User { id: "me".into(), username: "me".into(), ..Default::default() };
        Context::new(Arc::new(store), Session::new(viewer), TemplateRegistry::default())
    }

    fn target(id: &str) -> Post {
        Post {
            id: id.into(),
            author: "u2".into(),
            content: format!("body of {id}"),
            expand: PostExpand {
                author: Some(User { id: "u2".into(), username: "bob".into(), ..Default::default() }),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_confirm_creates_and_broadcasts() {
        let mut store = MockRecordStore::new();
        store
            .expect_create()
            .withf(|collection, fields, expand| {
                collection == collections::POSTS
                    && fields["original_post"] == "p1"
                    && fields["content"] == "nice"
                    && fields["author"] == "me"
                    && expand.to_string() == "author,original_post,original_post.author"
            })
            .times(1)
            .returning(|_, mut fields, _| {
                fields["id"] = Value::from("r1");
                Ok(fields)
            });
        store
            .expect_create()
            .withf(|collection, fields, _| {
                collection == collections::NOTIFICATIONS
                    && fields["user"] == "u2"
                    && fields["type"] == "repost"
                    && fields["source_user"] == "me"
                    && fields["post"] == "p1"
            })
            .times(1)
            .returning(|_, fields, _| Ok(fields));

        let ctx = ctx(store);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _sub = ctx.new_posts.subscribe(move |post| {
            assert_eq!(post.original_post.as_deref(), Some("p1"));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut composer = RepostComposer::new(&ctx);
        composer.open(&target("p1"));
        composer.set_text(" nice ");
        let outcome = composer.confirm().await.unwrap();
        outcome.notification.expect("the original's author is notified").await.unwrap();

        assert_eq!(outcome.post.id, "r1");
        assert!(!composer.is_open());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reposting_own_post_sends_no_notification() {
        let mut store = MockRecordStore::new();
        store
            .expect_create()
            .withf(|collection, _, _| collection == collections::POSTS)
            .times(1)
            .returning(|_, mut fields, _| {
                fields["id"] = Value::from("r1");
                Ok(fields)
            });
        let mut own = target("p1");
        own.author = "me".into();

        let mut composer = RepostComposer::new(&ctx(store));
        composer.open(&own);
        let outcome = composer.confirm().await.unwrap();
        assert!(outcome.notification.is_none());
    }

    #[tokio::test]
    async fn test_repost_of_repost_notifies_the_original_author() {
        let mut store = MockRecordStore::new();
        store
            .expect_create()
            .withf(|collection, _, _| collection == collections::POSTS)
            .times(1)
            .returning(|_, mut fields, _| {
                fields["id"] = Value::from("r2");
                Ok(fields)
            });
        store
            .expect_create()
            .withf(|collection, fields, _| collection == collections::NOTIFICATIONS && fields["user"] == "u2")
            .times(1)
            .returning(|_, fields, _| Ok(fields));

        let mut repost = target("r1");
        repost.author = "u3".into();
        repost.original_post = Some("p1".into());
        repost.expand.original_post = Some(Box::new(target("p1")));

        let mut composer = RepostComposer::new(&ctx(store));
        composer.open(&repost);
        let outcome = composer.confirm().await.unwrap();
        outcome.notification.expect("notified").await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_keeps_surface_open() {
        let mut store = MockRecordStore::new();
        store
            .expect_create()
            .times(1)
            .returning(|_, _, _| Err(AppError::Store { status: 500, message: "boom".into() }));

        let ctx = ctx(store);
        let _sub = ctx.new_posts.subscribe(|_| panic!("nothing was created"));
        let mut composer = RepostComposer::new(&ctx);
        composer.open(&target("p1"));
        assert!(composer.confirm().await.is_err());

        assert!(composer.is_open());
        assert_eq!(composer.error(), Some(REPOST_FAILED));
        let html = composer.render().unwrap().unwrap();
        assert!(html.contains(REPOST_FAILED));
        assert!(!html.contains("disabled"));
    }

    #[tokio::test]
    async fn test_overlong_comment_is_rejected_locally() {
        let mut store = MockRecordStore::new();
        store.expect_create().never();
        let mut composer = RepostComposer::new(&ctx(store));

        composer.open(&target("p1"));
        composer.set_text(&"x".repeat(501));
        let err = composer.confirm().await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(composer.is_open());
    }

    #[test]
    fn test_reopen_replaces_draft() {
        let mut composer = RepostComposer::new(&ctx(MockRecordStore::new()));
        composer.open(&target("p1"));
        composer.set_text("first draft");
        composer.open(&target("p2"));

        assert_eq!(composer.target_id(), Some("p2"));
        let html = composer.render().unwrap().unwrap();
        assert!(!html.contains("first draft"));
        assert!(html.contains("body of p2"));
        assert!(html.contains("post-card embedded"));
    }

    #[test]
    fn test_reposting_a_repost_targets_the_original() {
        let mut repost = target("r1");
        repost.content = String::new();
        repost.original_post = Some("p1".into());
        repost.expand.original_post = Some(Box::new(target("p1")));

        let mut composer = RepostComposer::new(&ctx(MockRecordStore::new()));
        composer.open(&repost);
        assert_eq!(composer.target_id(), Some("p1"));
        assert!(composer.render().unwrap().unwrap().contains("body of p1"));
    }

    #[test]
    fn test_cancel_discards() {
        let mut composer = RepostComposer::new(&ctx(MockRecordStore::new()));
        composer.open(&target("p1"));
        composer.cancel();
        assert!(!composer.is_open());
        assert_eq!(composer.render().unwrap(), None);
    }
}
