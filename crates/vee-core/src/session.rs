//! # Session
//!
//! The signed-in user, passed explicitly to every component. Clones share
//! the same state, so an explicit `refresh` after a mutation (following a
//! user, editing the profile) is seen by every holder.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use crate::error::Result;
use crate::models::User;
use crate::query::Expand;
use crate::traits::{records, RecordStore};

#[derive(Debug, Clone)]
pub struct Session {
    user: Arc<RwLock<User>>,
}

impl Session {
    pub fn new(user: User) -> Self {
        Self { user: Arc::new(RwLock::new(user)) }
    }

    fn read(&self) -> RwLockReadGuard<'_, User> {
        // A poisoned lock still holds a complete record.
        self.user.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the current user record.
    pub fn user(&self) -> User {
        self.read().clone()
    }

    pub fn user_id(&self) -> String {
        self.read().id.clone()
    }

    pub fn is_self(&self, user_id: &str) -> bool {
        self.read().id == user_id
    }

    pub fn following(&self) -> Vec<String> {
        self.read().following.clone()
    }

    /// Replaces the cached record with one the store just returned.
    pub fn set_user(&self, user: User) {
        let mut guard = self.user.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = user;
    }

    /// Re-reads the user record from the store.
    pub async fn refresh(&self, store: &dyn RecordStore) -> Result<()> {
        let id = self.user_id();
        let fresh = records::<User>(store).get_one(&id, &Expand::none()).await?;
        self.set_user(fresh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockRecordStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_refresh_is_shared_between_clones() {
        let session = Session::new(User { id: "u1".into(), username: "ada".into(), ..Default::default() });
        let other = session.clone();

        let mut store = MockRecordStore::new();
        store.expect_get_one().returning(|_, id, _| {
            Ok(json!({ "id": id, "username": "ada", "following": ["u2"] }))
        });

        session.refresh(&store).await.unwrap();
        assert_eq!(other.following(), vec!["u2".to_string()]);
        assert!(other.is_self("u1"));
    }
}
