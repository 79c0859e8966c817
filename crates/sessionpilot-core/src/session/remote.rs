//! Remote session backend speaking the PostgREST dialect (Supabase and
//! compatible hosts).
//!
//! Expected table layout:
//!
//! | column       | type   |
//! |--------------|--------|
//! | platform     | text   |
//! | account      | text   |
//! | cookies      | jsonb  |
//! | user_agent   | text   |
//! | updated_at   | int8   |
//!
//! with a unique constraint on `(platform, account)`.

use super::SessionBackend;
use crate::models::SessionRecord;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 15;
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Clone)]
pub struct RemoteSessionBackend {
    client: Client,
    table_url: Url,
    api_key: String,
}

impl RemoteSessionBackend {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self> {
        let table_url = Url::parse(&format!(
            "{}/rest/v1/{}",
            base_url.trim_end_matches('/'),
            table
        ))
        .with_context(|| format!("Invalid store URL: {}", base_url))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            table_url,
            api_key: api_key.to_string(),
        })
    }

    fn upsert_url(&self) -> Url {
        let mut url = self.table_url.clone();
        url.query_pairs_mut()
            .append_pair("on_conflict", "platform,account");
        url
    }

    fn lookup_url(&self, platform: &str, account: &str) -> Url {
        let mut url = self.table_url.clone();
        url.query_pairs_mut()
            .append_pair("platform", &format!("eq.{}", platform))
            .append_pair("account", &format!("eq.{}", account))
            .append_pair("order", "updated_at.desc")
            .append_pair("limit", "1");
        url
    }
}

#[async_trait]
impl SessionBackend for RemoteSessionBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn put(&self, record: &SessionRecord) -> Result<SessionRecord> {
        let response = self
            .client
            .post(self.upsert_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[record])
            .send()
            .await
            .context("Remote store is unreachable")?;

        let rows: Vec<SessionRecord> = ensure_success(response)
            .await?
            .json()
            .await
            .context("Remote store returned an unexpected upsert payload")?;

        Ok(rows.into_iter().next().unwrap_or_else(|| record.clone()))
    }

    async fn get(&self, platform: &str, account: &str) -> Result<Option<SessionRecord>> {
        let response = self
            .client
            .get(self.lookup_url(platform, account))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Remote store is unreachable")?;

        let rows: Vec<SessionRecord> = ensure_success(response)
            .await?
            .json()
            .await
            .context("Remote store returned an unexpected lookup payload")?;

        Ok(rows.into_iter().next())
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    bail!("Remote store returned {}: {}", status, excerpt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Rows = Arc<Mutex<HashMap<(String, String), SessionRecord>>>;

    const KEY: &str = "service-key";

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(KEY)
            && headers.get("authorization").and_then(|v| v.to_str().ok())
                == Some("Bearer service-key")
    }

    async fn upsert_rows(
        State(rows): State<Rows>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        Json(body): Json<Vec<SessionRecord>>,
    ) -> Result<Json<Vec<SessionRecord>>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        if query.get("on_conflict").map(String::as_str) != Some("platform,account") {
            return Err(StatusCode::CONFLICT);
        }
        let mut rows = rows.lock().unwrap();
        for record in &body {
            rows.insert(
                (record.platform.clone(), record.account.clone()),
                record.clone(),
            );
        }
        Ok(Json(body))
    }

    async fn select_rows(
        State(rows): State<Rows>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Result<Json<Vec<SessionRecord>>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let platform = query["platform"].trim_start_matches("eq.").to_string();
        let account = query["account"].trim_start_matches("eq.").to_string();
        let rows = rows.lock().unwrap();
        Ok(Json(rows.get(&(platform, account)).cloned().into_iter().collect()))
    }

    async fn spawn_fake_store() -> (String, Rows) {
        let rows: Rows = Arc::new(Mutex::new(HashMap::new()));
        let app = Router::new()
            .route("/rest/v1/sessions", post(upsert_rows).get(select_rows))
            .with_state(rows.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), rows)
    }

    fn record(value: &str) -> SessionRecord {
        SessionRecord::new(
            "tiktok",
            "creator",
            json!([{"name": "sessionid", "value": value}]),
            Some("UA".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_url_uses_postgrest_filters() {
        let backend =
            RemoteSessionBackend::new("https://db.example.com/", KEY, "sessions").unwrap();
        let url = backend.lookup_url("tiktok", "@me");
        assert_eq!(url.path(), "/rest/v1/sessions");
        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["platform"], "eq.tiktok");
        assert_eq!(pairs["account"], "eq.@me");
        assert_eq!(pairs["order"], "updated_at.desc");
        assert_eq!(pairs["limit"], "1");
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_lookup_returns_latest() {
        let (base_url, rows) = spawn_fake_store().await;
        let backend = RemoteSessionBackend::new(&base_url, KEY, "sessions").unwrap();

        backend.put(&record("first")).await.unwrap();
        backend.put(&record("second")).await.unwrap();

        assert_eq!(rows.lock().unwrap().len(), 1);
        let loaded = backend.get("tiktok", "creator").await.unwrap().unwrap();
        assert_eq!(loaded.cookies[0]["value"], "second");
    }

    #[tokio::test]
    async fn test_lookup_miss_is_none() {
        let (base_url, _rows) = spawn_fake_store().await;
        let backend = RemoteSessionBackend::new(&base_url, KEY, "sessions").unwrap();

        assert!(backend.get("tiktok", "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejected_credentials_surface_status() {
        let (base_url, _rows) = spawn_fake_store().await;
        let backend = RemoteSessionBackend::new(&base_url, "wrong", "sessions").unwrap();

        let err = backend.get("tiktok", "creator").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
