//! Following users and joining communities.
//!
//! Both relationships are id sets on a record (`users.following`,
//! `communities.members`); a toggle writes the whole updated set back and
//! adopts whatever the store returns.

use std::sync::atomic::AtomicBool;
use std::sync::{Mutex, MutexGuard};

use serde_json::json;
use tokio::task::JoinHandle;
use vee_core::{records, AppError, Community, NotificationKind, Result, User};

use crate::interaction::InFlight;
use crate::notify::NotificationDraft;
use crate::Context;

/// Result of a successful follow toggle.
#[derive(Debug)]
pub struct FollowOutcome {
    pub following: bool,
    pub notification: Option<JoinHandle<()>>,
}

pub struct FollowToggle {
    ctx: Context,
    target_id: String,
    in_flight: AtomicBool,
}

impl FollowToggle {
    pub fn new(ctx: &Context, target_id: &str) -> Result<Self> {
        if ctx.session.is_self(target_id) {
            return Err(AppError::validation("You cannot follow yourself."));
        }
        Ok(Self { ctx: ctx.clone(), target_id: target_id.to_string(), in_flight: AtomicBool::new(false) })
    }

    pub fn is_following(&self) -> bool {
        self.ctx.session.user().follows(&self.target_id)
    }

    /// Follows or unfollows. The session adopts the updated user record.
    pub async fn toggle(&self) -> Result<FollowOutcome> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let me = self.ctx.session.user();
        let follow = !me.follows(&self.target_id);

        let mut following = me.following.clone();
        if follow {
            following.push(self.target_id.clone());
        } else {
            following.retain(|id| id != &self.target_id);
        }

        let updated = records::<User>(self.ctx.store())
            .update(&me.id, json!({ "following": following }))
            .await
            .inspect_err(|err| {
                tracing::warn!(error = %err, target = %self.target_id, follow, "failed to update following");
            })?;
        self.ctx.session.set_user(updated);

        let notification = if follow {
            self.ctx.notifier.dispatch(NotificationDraft {
                recipient: self.target_id.clone(),
                kind: NotificationKind::Follow,
                source_user: me.id,
                post: None,
            })
        } else {
            None
        };

        Ok(FollowOutcome { following: follow, notification })
    }
}

pub struct MembershipToggle {
    ctx: Context,
    community: Mutex<Community>,
    in_flight: AtomicBool,
}

impl MembershipToggle {
    pub fn new(ctx: &Context, community: Community) -> Self {
        Self { ctx: ctx.clone(), community: Mutex::new(community), in_flight: AtomicBool::new(false) }
    }

    fn lock(&self) -> MutexGuard<'_, Community> {
        self.community.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn community(&self) -> Community {
        self.lock().clone()
    }

    pub fn is_member(&self) -> bool {
        self.lock().has_member(&self.ctx.session.user_id())
    }

    pub fn member_count(&self) -> usize {
        self.lock().members.len()
    }

    /// Joins or leaves; returns whether the viewer is now a member.
    pub async fn toggle(&self) -> Result<bool> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let user_id = self.ctx.session.user_id();
        let community = self.community();
        let join = !community.has_member(&user_id);

        let mut members = community.members.clone();
        if join {
            members.push(user_id.clone());
        } else {
            members.retain(|id| id != &user_id);
        }

        let updated = records::<Community>(self.ctx.store())
            .update(&community.id, json!({ "members": members }))
            .await
            .inspect_err(|err| {
                tracing::warn!(error = %err, community = %community.id, join, "failed to update membership");
            })?;

        let member = updated.has_member(&user_id);
        *self.lock() = updated;
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use serde_json::Value;
    use vee_core::{collections, MockRecordStore, Session};
    use vee_ui::TemplateRegistry;

    fn ctx(store: MockRecordStore, following: &[&str]) -> Context {
        let viewer = User {
            id: "a".into(),
            username: "a".into(),
            following: following.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        };
        Context::new(Arc::new(store), Session::new(viewer), TemplateRegistry::default())
    }

    fn echo_update(store: &mut MockRecordStore) {
        store.expect_update().returning(|collection, id, fields| {
            let mut record = fields;
            record["id"] = Value::from(id);
            if collection == collections::USERS {
                record["username"] = Value::from("a");
            } else {
                record["name"] = Value::from("Rust");
            }
            Ok(record)
        });
    }

    #[tokio::test]
    async fn test_follow_updates_session_and_notifies() {
        let mut store = MockRecordStore::new();
        echo_update(&mut store);
        store
            .expect_create()
            .withf(|collection, fields, _| {
                collection == collections::NOTIFICATIONS && fields["type"] == "follow" && fields["user"] == "b"
            })
            .times(1)
            .returning(|_, fields, _| Ok(fields));

        let ctx = ctx(store, &[]);
        let toggle = FollowToggle::new(&ctx, "b").unwrap();
        let outcome = toggle.toggle().await.unwrap();

        assert!(outcome.following);
        assert_eq!(ctx.session.following(), vec!["b".to_string()]);
        outcome.notification.unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_unfollow_sends_nothing() {
        let mut store = MockRecordStore::new();
        echo_update(&mut store);
        store.expect_create().never();

        let ctx = ctx(store, &["b", "c"]);
        let outcome = FollowToggle::new(&ctx, "b").unwrap().toggle().await.unwrap();
        assert!(!outcome.following);
        assert!(outcome.notification.is_none());
        assert_eq!(ctx.session.following(), vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_follow_leaves_session() {
        let mut store = MockRecordStore::new();
        store.expect_update().returning(|_, _, _| Err(AppError::Unauthorized("expired".into())));

        let ctx = ctx(store, &[]);
        let toggle = FollowToggle::new(&ctx, "b").unwrap();
        assert!(toggle.toggle().await.is_err());
        assert!(!toggle.is_following());
    }

    #[test]
    fn test_cannot_follow_self() {
        let ctx = ctx(MockRecordStore::new(), &[]);
        assert!(FollowToggle::new(&ctx, "a").is_err());
    }

    #[tokio::test]
    async fn test_join_then_leave() {
        let mut store = MockRecordStore::new();
        echo_update(&mut store);

        let ctx = ctx(store, &[]);
        let community = Community { id: "c".into(), name: "Rust".into(), members: vec!["z".into()], ..Default::default() };
        let toggle = MembershipToggle::new(&ctx, community);

        assert!(toggle.toggle().await.unwrap());
        assert_eq!(toggle.member_count(), 2);
        assert!(!toggle.toggle().await.unwrap());
        assert_eq!(toggle.community().members, vec!["z".to_string()]);
    }
}
