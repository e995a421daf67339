//! New-post composition.

use serde_json::{json, Value};
use vee_core::{records, validation, Community, Expand, Filter, ListQuery, Post, Result};

use crate::Context;

const POST_FAILED: &str = "Failed to create post. Please try again.";

pub struct PostComposer {
    ctx: Context,
    text: String,
    community: Option<String>,
    error: Option<String>,
}

impl PostComposer {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone(), text: String::new(), community: None, error: None }
    }

    /// The communities the viewer may post into.
    pub async fn communities(&self) -> Result<Vec<Community>> {
        let query = ListQuery::new().filter(Filter::contains("members", self.ctx.session.user_id()));
        records::<Community>(self.ctx.store()).full_list(query).await.inspect_err(|err| {
            tracing::warn!(error = %err, "failed to load the viewer's communities");
        })
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    /// `None` posts to the author's profile only.
    pub fn set_community(&mut self, community: Option<String>) {
        self.community = community.filter(|id| !id.is_empty());
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Publishes the draft and announces it on the new-post signal.
    pub async fn submit(&mut self) -> Result<Post> {
        self.error = None;
        let content = match validation::content(self.text.trim()) {
            Ok(content) => content,
            Err(err) => {
                self.error = Some(err.user_message());
                return Err(err);
            }
        };

        let mut fields = json!({ "author": self.ctx.session.user_id(), "content": content });
        if let Some(community) = &self.community {
            fields["community"] = Value::from(community.as_str());
        }

        match records::<Post>(self.ctx.store()).create(fields, &Expand::paths(["author"])).await {
            Ok(post) => {
                self.text.clear();
                self.community = None;
                self.ctx.new_posts.emit(&post);
                Ok(post)
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to create post");
                self.error = Some(POST_FAILED.to_string());
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
    use vee_core::{collections, AppError, MockRecordStore, Session, User};
    use vee_ui::TemplateRegistry;

    fn ctx(store: MockRecordStore) -> Context {
        let viewer = User { id: "me".into(), username: "me".into(), ..Default::default() };
        Context::new(Arc::new(store), Session::new(viewer), TemplateRegistry::default())
    }

    #[tokio::test]
    async fn test_submit_into_community() {
        let mut store = MockRecordStore::new();
        store
            .expect_create()
            .withf(|collection, fields, expand| {
                collection == collections::POSTS
                    && fields["community"] == "c1"
                    && fields["content"] == "hello"
                    && expand.to_string() == "author"
            })
            .times(1)
            .returning(|_, mut fields, _| {
                fields["id"] = Value::from("p1");
                Ok(fields)
            });

        let ctx = ctx(store);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _sub = ctx.new_posts.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut composer = PostComposer::new(&ctx);
        composer.set_text("hello ");
        composer.set_community(Some("c1".into()));
        let post = composer.submit().await.unwrap();

        assert_eq!(post.community.as_deref(), Some("c1"));
        assert_eq!(composer.char_count(), 0);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_post_is_rejected_locally() {
        let mut store = MockRecordStore::new();
        store.expect_create().never();

        let mut composer = PostComposer::new(&ctx(store));
        composer.set_text("   ");
        assert!(composer.submit().await.is_err());
        assert_eq!(composer.error(), Some("Content cannot be empty."));
    }

    #[tokio::test]
    async fn test_failure_keeps_draft() {
        let mut store = MockRecordStore::new();
        store.expect_create().returning(|_, _, _| Err(AppError::Transport("offline".into())));

        let mut composer = PostComposer::new(&ctx(store));
        composer.set_text("keep me");
        assert!(composer.submit().await.is_err());
        assert_eq!(composer.error(), Some(POST_FAILED));
        assert_eq!(composer.char_count(), 7);
    }
}
