//! # vee-store-pocketbase
//!
//! `RecordStore` over a PocketBase server's REST API
//! (`/api/collections/{collection}/records`).
//!
//! Unpaged list calls are fetched in batches of [`BATCH_SIZE`] until a
//! short page comes back. After [`PocketBaseStore::authenticate`] every
//! request carries the auth token.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use vee_core::{AppError, Expand, Filter, ListQuery, Page, RecordStore, Result, User};

pub const BATCH_SIZE: u32 = 500;

const NOT_UNIQUE: &str = "validation_not_unique";

pub struct PocketBaseStore {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    items: Vec<Value>,
    /// `-1` when the total was skipped
    #[serde(rename = "totalItems", default)]
    total_items: i64,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    record: User,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Map<String, Value>,
}

impl PocketBaseStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to create http client: {err}")))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, token: RwLock::new(None) }
    }

    /// Signs in with username or email and keeps the token for later calls.
    pub async fn authenticate(&self, identity: &str, password: &str) -> Result<User> {
        let url = format!("{}/api/collections/users/auth-with-password", self.base_url);
        let body = self
            .send(
                self.client.post(url).json(&json!({ "identity": identity, "password": password })),
                ("users", identity),
            )
            .await?;
        let auth: AuthResponse = serde_json::from_value(body)?;

        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(auth.token);
        tracing::info!(user = %auth.record.username, "authenticated against record store");
        Ok(auth.record)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().unwrap_or_else(|poisoned| poisoned.into_inner()).is_some()
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{collection}/records", self.base_url)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let request = self.client.request(method, url);
        match self.token.read().unwrap_or_else(|poisoned| poisoned.into_inner()).as_deref() {
            Some(token) => request.header(AUTHORIZATION, token),
            None => request,
        }
    }

    /// Sends and decodes the body; `subject` names the record for `NotFound`.
    async fn send(&self, request: RequestBuilder, subject: (&str, &str)) -> Result<Value> {
        let response = request.send().await.map_err(|err| AppError::Transport(err.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|err| AppError::Transport(err.to_string()))?;
        tracing::debug!(status = status.as_u16(), collection = subject.0, "record store response");

        if !status.is_success() {
            return Err(error_for(status.as_u16(), &text, subject));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn list_page(&self, collection: &str, params: &[(&'static str, String)]) -> Result<ListResponse> {
        let request = self.request(Method::GET, self.records_url(collection)).query(params);
        Ok(serde_json::from_value(self.send(request, (collection, "list")).await?)?)
    }
}

#[async_trait]
impl RecordStore for PocketBaseStore {
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Page<Value>> {
        let mut params = list_params(query);
        if let Some(paging) = query.paging {
            params.push(("page", paging.page.to_string()));
            params.push(("perPage", paging.per_page.to_string()));
            let page = self.list_page(collection, &params).await?;
            return Ok(Page { items: page.items, total: page.total_items.max(0) as u64 });
        }

        let mut items = Vec::new();
        for page in 1.. {
            let mut batch_params = params.clone();
            batch_params.push(("page", page.to_string()));
            batch_params.push(("perPage", BATCH_SIZE.to_string()));
            batch_params.push(("skipTotal", "1".to_string()));

            let batch = self.list_page(collection, &batch_params).await?;
            let short = batch.items.len() < BATCH_SIZE as usize;
            items.extend(batch.items);
            if short {
                break;
            }
        }
        let total = items.len() as u64;
        Ok(Page { items, total })
    }

    async fn get_one(&self, collection: &str, id: &str, expand: &Expand) -> Result<Value> {
        let mut request = self.request(Method::GET, format!("{}/{id}", self.records_url(collection)));
        if !expand.is_empty() {
            request = request.query(&[("expand", expand.to_string())]);
        }
        self.send(request, (collection, id)).await
    }

    async fn get_first_matching(&self, collection: &str, filter: &Filter) -> Result<Value> {
        let params = [
            ("filter", filter.to_string()),
            ("page", "1".to_string()),
            ("perPage", "1".to_string()),
            ("skipTotal", "1".to_string()),
        ];
        self.list_page(collection, &params)
            .await?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(collection, filter.to_string()))
    }

    async fn create(&self, collection: &str, fields: Value, expand: &Expand) -> Result<Value> {
        let mut request = self.request(Method::POST, self.records_url(collection)).json(&fields);
        if !expand.is_empty() {
            request = request.query(&[("expand", expand.to_string())]);
        }
        self.send(request, (collection, "new")).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Value> {
        let request = self
            .request(Method::PATCH, format!("{}/{id}", self.records_url(collection)))
            .json(&fields);
        self.send(request, (collection, id)).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let request = self.request(Method::DELETE, format!("{}/{id}", self.records_url(collection)));
        self.send(request, (collection, id)).await?;
        Ok(())
    }
}

/// Query parameters for filter, sort and expand; paging is added by the caller.
fn list_params(query: &ListQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(filter) = &query.filter {
        params.push(("filter", filter.to_string()));
    }
    if !query.sort.is_empty() {
        params.push(("sort", query.sort_expr()));
    }
    if !query.expand.is_empty() {
        params.push(("expand", query.expand.to_string()));
    }
    params
}

/// Maps a failed response to the error taxonomy. Field errors of a
/// rejected payload are folded into the validation message; a unique index
/// violation is a conflict.
fn error_for(status: u16, body: &str, (collection, key): (&str, &str)) -> AppError {
    let body: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    match status {
        404 => AppError::not_found(collection, key),
        401 | 403 => AppError::Unauthorized(body.message),
        400 if body.data.values().any(|detail| detail.get("code").and_then(Value::as_str) == Some(NOT_UNIQUE)) => {
            let fields: Vec<&str> = body.data.keys().map(String::as_str).collect();
            AppError::Conflict(format!("{collection}: {} already taken", fields.join(", ")))
        }
        400 => {
            let fields: Vec<String> = body
                .data
                .iter()
                .map(|(field, detail)| {
                    let message = detail.get("message").and_then(Value::as_str).unwrap_or("invalid value");
                    format!("{field}: {message}")
                })
                .collect();
            if fields.is_empty() {
                AppError::validation(body.message)
            } else {
                AppError::validation(fields.join("; "))
            }
        }
        _ => AppError::Store { status, message: body.message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vee_core::Sort;

    #[test]
    fn test_status_mapping() {
        let subject = ("posts", "p1");
        assert_eq!(error_for(404, "", subject), AppError::not_found("posts", "p1"));
        assert_eq!(
            error_for(403, r#"{"code":403,"message":"Only admins can perform this action."}"#, subject),
            AppError::Unauthorized("Only admins can perform this action.".into())
        );
        assert_eq!(
            error_for(502, "<html>bad gateway</html>", subject),
            AppError::Store { status: 502, message: String::new() }
        );
    }

    #[test]
    fn test_validation_lists_field_errors() {
        let body = r#"{
            "code": 400,
            "message": "Failed to create record.",
            "data": { "content": { "code": "validation_max_text_constraint", "message": "Must be less than 500 character(s)." } }
        }"#;
        assert_eq!(
            error_for(400, body, ("posts", "new")),
            AppError::validation("content: Must be less than 500 character(s).")
        );
        assert_eq!(
            error_for(400, r#"{"message":"Something went wrong."}"#, ("posts", "new")),
            AppError::validation("Something went wrong.")
        );
    }

    #[test]
    fn test_unique_violation_is_conflict() {
        let body = r#"{
            "code": 400,
            "message": "Failed to create record.",
            "data": {
                "user": { "code": "validation_not_unique", "message": "Value must be unique." },
                "post": { "code": "validation_not_unique", "message": "Value must be unique." }
            }
        }"#;
        let err = error_for(400, body, ("interactions", "new"));
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_list_params() {
        let query = ListQuery::new()
            .filter(Filter::eq("author", "u1"))
            .sort(Sort::desc("created"))
            .expand(Expand::post_with_original());
        assert_eq!(
            list_params(&query),
            vec![
                ("filter", r#"author = "u1""#.to_string()),
                ("sort", "-created".to_string()),
                ("expand", "author,original_post,original_post.author".to_string()),
            ]
        );
        assert!(list_params(&ListQuery::new()).is_empty());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let store = PocketBaseStore::with_client("http://127.0.0.1:8090/", reqwest::Client::new());
        assert_eq!(store.records_url("posts"), "http://127.0.0.1:8090/api/collections/posts/records");
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let store = PocketBaseStore::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = store.get_one("posts", "p1", &Expand::none()).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }
}
