//! # vee-store-memory
//!
//! An in-process `RecordStore`. Each collection is a list of JSON records
//! kept in a concurrent map. Relations, uniqueness and filtering behave
//! like the remote store closely enough for end-to-end tests and the
//! `demo` command.
//!
//! Passwords are kept in plain text and never returned; this store is
//! not meant to hold real accounts.

mod eval;

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;
use vee_core::{collections, AppError, Expand, Filter, ListQuery, Page, Paging, RecordStore, Result};

use eval::Row;

/// Fields never handed back to callers.
const HIDDEN_FIELDS: [&str; 3] = ["password", "passwordConfirm", "oldPassword"];

#[derive(Debug, Clone)]
struct Relation {
    target: String,
}

/// Relation fields and unique keys, per collection.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    relations: HashMap<(String, String), Relation>,
    unique: HashMap<String, Vec<Vec<String>>>,
}

impl Schema {
    /// Declares `collection.field` as holding an id (or a list of ids) of
    /// `target` records, which makes it expandable.
    pub fn relation(mut self, collection: &str, field: &str, target: &str) -> Self {
        self.relations.insert(
            (collection.to_string(), field.to_string()),
            Relation { target: target.to_string() },
        );
        self
    }

    pub fn unique(mut self, collection: &str, fields: &[&str]) -> Self {
        self.unique
            .entry(collection.to_string())
            .or_default()
            .push(fields.iter().map(|field| field.to_string()).collect());
        self
    }

    /// The collections of the social network.
    pub fn social() -> Self {
        use collections::*;

        Self::default()
            .relation(USERS, "following", USERS)
            .relation(COMMUNITIES, "members", USERS)
            .relation(POSTS, "author", USERS)
            .relation(POSTS, "community", COMMUNITIES)
            .relation(POSTS, "original_post", POSTS)
            .relation(INTERACTIONS, "user", USERS)
            .relation(INTERACTIONS, "post", POSTS)
            .relation(COMMENTS, "user", USERS)
            .relation(COMMENTS, "post", POSTS)
            .relation(COMMENTS, "parent_comment", COMMENTS)
            .relation(NOTIFICATIONS, "user", USERS)
            .relation(NOTIFICATIONS, "source_user", USERS)
            .relation(NOTIFICATIONS, "post", POSTS)
            .unique(USERS, &["username"])
            .unique(INTERACTIONS, &["user", "post", "type"])
    }

    fn relation_of(&self, collection: &str, field: &str) -> Option<&Relation> {
        self.relations.get(&(collection.to_string(), field.to_string()))
    }

    fn unique_keys(&self, collection: &str) -> &[Vec<String>] {
        self.unique.get(collection).map(Vec::as_slice).unwrap_or_default()
    }
}

pub struct MemoryStore {
    collections: DashMap<String, Vec<Row>>,
    schema: Schema,
    last_created: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new(schema: Schema) -> Self {
        Self { collections: DashMap::new(), schema, last_created: Mutex::new(None) }
    }

    pub fn with_social_schema() -> Self {
        Self::new(Schema::social())
    }

    /// Inserts a record synchronously. An `id` in `fields` is kept, which
    /// lets seed data wire relations up front.
    pub fn insert(&self, collection: &str, fields: Value) -> Result<Value> {
        let mut record = into_row(fields)?;
        if collection == collections::USERS {
            check_password_change(None, &mut record)?;
        }

        let id = match record.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => new_id(),
        };
        let now = self.tick();
        record.insert("id".into(), Value::from(id.as_str()));
        record.insert("created".into(), Value::from(now.as_str()));
        record.insert("updated".into(), Value::from(now));

        let mut rows = self.collections.entry(collection.to_string()).or_default();
        if rows.iter().any(|row| id_of(row) == id) {
            return Err(AppError::Conflict(format!("{collection}: id {id} already exists")));
        }
        self.check_unique(collection, &rows, &record)?;
        rows.push(record.clone());
        drop(rows);

        tracing::debug!(collection, id = %id, "record created");
        Ok(public(record))
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |rows| rows.len())
    }

    /// Strictly increasing creation stamps, microsecond precision.
    fn tick(&self) -> String {
        let mut last = self.last_created.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Utc::now().trunc_subsecs(6);
        let next = match *last {
            Some(previous) if now <= previous => previous + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(next);
        next.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn check_unique(&self, collection: &str, rows: &[Row], record: &Row) -> Result<()> {
        for key in self.schema.unique_keys(collection) {
            let clash = rows.iter().any(|row| {
                id_of(row) != id_of(record) && key.iter().all(|field| row.get(field) == record.get(field))
            });
            if clash {
                return Err(AppError::Conflict(format!(
                    "{collection}: ({}) must be unique",
                    key.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn rows(&self, collection: &str) -> Vec<Row> {
        self.collections.get(collection).map(|rows| rows.clone()).unwrap_or_default()
    }

    fn find(&self, collection: &str, id: &str) -> Option<Row> {
        let rows = self.collections.get(collection)?;
        let found = rows.iter().find(|row| id_of(row) == id).cloned();
        found
    }

    fn expanded(&self, collection: &str, mut record: Row, expand: &Expand) -> Value {
        let paths: Vec<Vec<&str>> = expand.iter().map(|path| path.split('.').collect()).collect();
        self.expand_into(collection, &mut record, &paths);
        public(record)
    }

    /// Resolves each relation named by the paths' first segment into
    /// `expand`, then recurses with the remaining segments.
    fn expand_into(&self, collection: &str, record: &mut Row, paths: &[Vec<&str>]) {
        let mut heads: Vec<&str> = Vec::new();
        for head in paths.iter().filter_map(|path| path.first().copied()) {
            if !heads.contains(&head) {
                heads.push(head);
            }
        }

        let mut expansions = Row::new();
        for head in heads {
            let Some(relation) = self.schema.relation_of(collection, head) else {
                continue;
            };
            let tails: Vec<Vec<&str>> = paths
                .iter()
                .filter(|path| path.len() > 1 && path[0] == head)
                .map(|path| path[1..].to_vec())
                .collect();
            let resolve = |id: &str| {
                let mut target = self.find(&relation.target, id)?;
                self.expand_into(&relation.target, &mut target, &tails);
                Some(public(target))
            };

            let value = match record.get(head) {
                Some(Value::String(id)) if !id.is_empty() => resolve(id),
                Some(Value::Array(ids)) => {
                    let items: Vec<Value> = ids.iter().filter_map(Value::as_str).filter_map(resolve).collect();
                    (!items.is_empty()).then_some(Value::Array(items))
                }
                _ => None,
            };
            if let Some(value) = value {
                expansions.insert(head.to_string(), value);
            }
        }

        if !expansions.is_empty() {
            record.insert("expand".into(), Value::Object(expansions));
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_social_schema()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Page<Value>> {
        let mut matched: Vec<Row> = self
            .rows(collection)
            .into_iter()
            .filter(|row| query.filter.as_ref().map_or(true, |filter| eval::matches(filter, row)))
            .collect();
        eval::sort(&mut matched, &query.sort);

        let total = matched.len() as u64;
        let selected: Vec<Row> = match query.paging {
            Some(Paging { page, per_page }) => {
                let skip = (page.max(1) as usize - 1) * per_page as usize;
                matched.into_iter().skip(skip).take(per_page as usize).collect()
            }
            None => matched,
        };

        let items = selected
            .into_iter()
            .map(|row| self.expanded(collection, row, &query.expand))
            .collect();
        Ok(Page { items, total })
    }

    async fn get_one(&self, collection: &str, id: &str, expand: &Expand) -> Result<Value> {
        let record = self.find(collection, id).ok_or_else(|| AppError::not_found(collection, id))?;
        Ok(self.expanded(collection, record, expand))
    }

    async fn get_first_matching(&self, collection: &str, filter: &Filter) -> Result<Value> {
        self.rows(collection)
            .into_iter()
            .find(|row| eval::matches(filter, row))
            .map(public)
            .ok_or_else(|| AppError::not_found(collection, filter.to_string()))
    }

    async fn create(&self, collection: &str, fields: Value, expand: &Expand) -> Result<Value> {
        let created = into_row(self.insert(collection, fields)?)?;
        Ok(self.expanded(collection, created, expand))
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Value> {
        let mut fields = into_row(fields)?;
        let mut rows = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| AppError::not_found(collection, id))?;
        let index = rows
            .iter()
            .position(|row| id_of(row) == id)
            .ok_or_else(|| AppError::not_found(collection, id))?;

        let mut record = rows[index].clone();
        if collection == collections::USERS {
            check_password_change(Some(&record), &mut fields)?;
        }
        for (field, value) in fields {
            if field != "id" && field != "created" {
                record.insert(field, value);
            }
        }
        record.insert("updated".into(), Value::from(self.tick()));
        self.check_unique(collection, &rows, &record)?;
        rows[index] = record.clone();
        drop(rows);

        tracing::debug!(collection, id, "record updated");
        Ok(public(record))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut rows = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| AppError::not_found(collection, id))?;
        let index = rows
            .iter()
            .position(|row| id_of(row) == id)
            .ok_or_else(|| AppError::not_found(collection, id))?;
        rows.remove(index);
        drop(rows);

        tracing::debug!(collection, id, "record deleted");
        Ok(())
    }
}

fn into_row(fields: Value) -> Result<Row> {
    match fields {
        Value::Object(row) => Ok(row),
        other => Err(AppError::validation(format!("expected a record object, got {other}"))),
    }
}

fn id_of(row: &Row) -> &str {
    row.get("id").and_then(Value::as_str).unwrap_or_default()
}

/// Fifteen lowercase alphanumerics, the shape of the remote store's ids.
fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..15].to_string()
}

fn public(mut row: Row) -> Value {
    for field in HIDDEN_FIELDS {
        row.remove(field);
    }
    Value::Object(row)
}

/// A password write must repeat itself in `passwordConfirm` and, when one
/// is already set, name it in `oldPassword`. The helper fields are dropped.
fn check_password_change(current: Option<&Row>, fields: &mut Row) -> Result<()> {
    let old = fields.remove("oldPassword");
    let confirm = fields.remove("passwordConfirm");
    let Some(password) = fields.get("password") else {
        return Ok(());
    };
    if confirm.as_ref() != Some(password) {
        return Err(AppError::validation("passwordConfirm: Values don't match."));
    }
    if let Some(stored) = current.and_then(|row| row.get("password")) {
        if old.as_ref() != Some(stored) {
            return Err(AppError::validation("oldPassword: Missing or invalid old password."));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vee_core::{records, Post, Sort};

    fn seeded() -> MemoryStore {
        let store = MemoryStore::with_social_schema();
        store.insert(collections::USERS, json!({ "id": "a", "username": "ada" })).unwrap();
        store.insert(collections::USERS, json!({ "id": "b", "username": "bob" })).unwrap();
        store
            .insert(collections::POSTS, json!({ "id": "p1", "author": "b", "content": "hello" }))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_create_expands_nested_relations() {
        let store = seeded();
        let repost: Post = records(&store)
            .create(
                json!({ "author": "a", "content": "", "original_post": "p1" }),
                &Expand::post_with_original(),
            )
            .await
            .unwrap();

        assert_eq!(repost.author_record().unwrap().username, "ada");
        let original = repost.original().unwrap();
        assert_eq!(original.content, "hello");
        assert_eq!(original.author_record().unwrap().username, "bob");
    }

    #[tokio::test]
    async fn test_duplicate_interaction_conflicts() {
        let store = seeded();
        let like = json!({ "user": "a", "post": "p1", "type": "like" });
        store.create(collections::INTERACTIONS, like.clone(), &Expand::none()).await.unwrap();

        let err = store.create(collections::INTERACTIONS, like, &Expand::none()).await.unwrap_err();
        assert_eq!(err.status(), Some(409));

        let bookmark = json!({ "user": "a", "post": "p1", "type": "bookmark" });
        assert!(store.create(collections::INTERACTIONS, bookmark, &Expand::none()).await.is_ok());
    }

    #[tokio::test]
    async fn test_created_is_strictly_increasing() {
        let store = seeded();
        for i in 0..20 {
            store.insert(collections::POSTS, json!({ "author": "a", "content": i.to_string() })).unwrap();
        }

        let query = ListQuery::new().sort(Sort::desc("created")).page(1, 5);
        let page = store.list(collections::POSTS, &query).await.unwrap();
        assert_eq!(page.total, 21);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0]["content"], "19");
        assert_eq!(page.items[4]["content"], "15");

        let all = store.list(collections::POSTS, &ListQuery::new()).await.unwrap();
        let stamps: Vec<_> = all.items.iter().map(|p| p["created"].as_str().unwrap().to_string()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let store = seeded();
        assert!(store.get_one(collections::POSTS, "nope", &Expand::none()).await.unwrap_err().is_not_found());
        assert!(store.delete(collections::POSTS, "nope").await.unwrap_err().is_not_found());
        assert!(store
            .get_first_matching(collections::USERS, &Filter::eq("username", "ghost"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = seeded();
        let updated = store
            .update(collections::USERS, "a", json!({ "following": ["b"], "id": "hijack" }))
            .await
            .unwrap();
        assert_eq!(updated["id"], "a");
        assert_eq!(updated["username"], "ada");
        assert_eq!(updated["following"], json!(["b"]));

        let taken = store.update(collections::USERS, "a", json!({ "username": "bob" })).await;
        assert_eq!(taken.unwrap_err().status(), Some(409));
    }

    #[tokio::test]
    async fn test_password_change_requires_old_password() {
        let store = MemoryStore::with_social_schema();
        let user = store
            .insert(
                collections::USERS,
                json!({ "id": "a", "username": "ada", "password": "secret123", "passwordConfirm": "secret123" }),
            )
            .unwrap();
        assert!(user.get("password").is_none());

        let wrong = json!({ "oldPassword": "nope", "password": "newpass99", "passwordConfirm": "newpass99" });
        assert!(store.update(collections::USERS, "a", wrong).await.is_err());

        let right = json!({ "oldPassword": "secret123", "password": "newpass99", "passwordConfirm": "newpass99" });
        let updated = store.update(collections::USERS, "a", right).await.unwrap();
        assert!(updated.get("password").is_none());
    }
}
