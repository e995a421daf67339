//! # Core Traits (Ports)
//!
//! Any record store adapter must implement these traits to be used by the
//! client. Records cross the port as JSON objects; `Records` layers the
//! typed models on top.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::Record;
use crate::query::{Expand, Filter, ListQuery, Page};

/// Generic remote object store contract.
///
/// Every failure is status coded; `AppError::NotFound` (404) is a normal
/// answer to "does a matching record exist".
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists matching records. Without paging, all matching records.
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Page<Value>>;

    async fn get_one(&self, collection: &str, id: &str, expand: &Expand) -> Result<Value>;

    async fn get_first_matching(&self, collection: &str, filter: &Filter) -> Result<Value>;

    async fn create(&self, collection: &str, fields: Value, expand: &Expand) -> Result<Value>;

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Value>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Typed access to one collection of a [`RecordStore`].
pub struct Records<'a, R> {
    store: &'a dyn RecordStore,
    _record: PhantomData<fn() -> R>,
}

/// Shorthand for `Records::<R>::new(store)`.
pub fn records<R: Record>(store: &dyn RecordStore) -> Records<'_, R> {
    Records::new(store)
}

impl<'a, R: Record> Records<'a, R> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store, _record: PhantomData }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<R>> {
        let page = self.store.list(R::COLLECTION, query).await?;
        let items = page
            .items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<R>, _>>()?;
        Ok(Page { items, total: page.total })
    }

    /// Every matching record, ignoring any paging on `query`.
    pub async fn full_list(&self, query: ListQuery) -> Result<Vec<R>> {
        let query = ListQuery { paging: None, ..query };
        Ok(self.list(&query).await?.items)
    }

    pub async fn get_one(&self, id: &str, expand: &Expand) -> Result<R> {
        Ok(serde_json::from_value(self.store.get_one(R::COLLECTION, id, expand).await?)?)
    }

    pub async fn first_matching(&self, filter: &Filter) -> Result<R> {
        Ok(serde_json::from_value(self.store.get_first_matching(R::COLLECTION, filter).await?)?)
    }

    /// Existence check: `NotFound` becomes `Ok(None)`.
    pub async fn find_first(&self, filter: &Filter) -> Result<Option<R>> {
        match self.first_matching(filter).await {
            Ok(record) => Ok(Some(record)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn create(&self, fields: Value, expand: &Expand) -> Result<R> {
        Ok(serde_json::from_value(self.store.create(R::COLLECTION, fields, expand).await?)?)
    }

    pub async fn update(&self, id: &str, fields: Value) -> Result<R> {
        Ok(serde_json::from_value(self.store.update(R::COLLECTION, id, fields).await?)?)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(R::COLLECTION, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{collections, User};
    use serde_json::json;

    #[tokio::test]
    async fn test_find_first_maps_not_found_to_none() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_first_matching()
            .withf(|collection, _| collection == collections::USERS)
            .returning(|_, _| Err(AppError::not_found("users", "username = \"ghost\"")));

        let found = records::<User>(&store)
            .find_first(&Filter::eq("username", "ghost"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_first_propagates_other_failures() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_first_matching()
            .returning(|_, _| Err(AppError::Store { status: 500, message: "boom".into() }));

        let err = records::<User>(&store)
            .find_first(&Filter::eq("username", "ada"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_list_decodes_records() {
        let mut store = MockRecordStore::new();
        store.expect_list().returning(|_, _| {
            Ok(Page { items: vec![json!({ "id": "u1", "username": "ada" })], total: 7 })
        });

        let page = records::<User>(&store).list(&ListQuery::new().page(1, 1)).await.unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.items[0].username, "ada");
    }
}
