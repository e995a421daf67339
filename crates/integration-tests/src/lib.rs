//! Shared fixtures: a seeded in-memory store and signed-in contexts.
//!
//! Users `a`, `b`, `c` and `z`; community `c1` (members `c`); posts by `b`,
//! `z` and one in `c1`, created in that order.

use std::sync::Arc;

use serde_json::json;
use vee_client::Context;
use vee_core::{collections, records, Filter, RecordStore, Session, User};
use vee_store_memory::MemoryStore;
use vee_ui::TemplateRegistry;

pub fn seeded() -> Arc<MemoryStore> {
    let store = MemoryStore::with_social_schema();
    for id in ["a", "b", "c", "z"] {
        store
            .insert(collections::USERS, json!({ "id": id, "username": format!("user_{id}") }))
            .expect("seed user");
    }
    store
        .insert(
            collections::COMMUNITIES,
            json!({ "id": "c1", "name": "Rust", "members": ["c"], "private": false }),
        )
        .expect("seed community");
    for (id, author, community) in [("pb", "b", ""), ("pz", "z", ""), ("pc", "c", "c1")] {
        store
            .insert(
                collections::POSTS,
                json!({ "id": id, "author": author, "community": community, "content": format!("post {id}") }),
            )
            .expect("seed post");
    }
    Arc::new(store)
}

/// A context signed in as `user_id`, as the store currently has them.
pub async fn sign_in(store: &Arc<MemoryStore>, user_id: &str) -> Context {
    let dyn_store: Arc<dyn RecordStore> = store.clone();
    let user = records::<User>(dyn_store.as_ref())
        .first_matching(&Filter::eq("id", user_id))
        .await
        .expect("seeded user");
    Context::new(dyn_store, Session::new(user), TemplateRegistry::default())
}
