use crate::api::{ApiError, ApiResponse, state::AppState};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sessionpilot_core::SessionSummary;
use sessionpilot_core::models::session_key;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSessionRequest {
    pub platform: Option<String>,
    pub account: Option<String>,
    #[serde(default)]
    pub cookies: Value,
    pub user_agent: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSaved {
    pub platform: String,
    pub account: String,
    pub cookie_count: usize,
    pub updated_at: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session: SessionSummary,
}

// POST /api/sessions
pub async fn save_session(
    State(state): State<AppState>,
    payload: Result<Json<SaveSessionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SessionSaved>>, ApiError> {
    let Json(request) = payload?;
    let defaults = &state.config.defaults;
    let platform = request
        .platform
        .unwrap_or_else(|| defaults.platform.clone());
    // An empty account is rejected by the store after its configuration check.
    let account = request
        .account
        .or_else(|| defaults.account.clone())
        .unwrap_or_default();

    let record = state
        .store
        .upsert(&platform, &account, request.cookies, request.user_agent)
        .await?;

    Ok(Json(ApiResponse::ok(SessionSaved {
        platform: record.platform,
        account: record.account,
        cookie_count: record.cookies.len(),
        updated_at: record.updated_at,
    })))
}

// GET /api/sessions/{platform}/{account}
pub async fn get_session(
    State(state): State<AppState>,
    Path((platform, account)): Path<(String, String)>,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    match state.store.load(&platform, &account).await? {
        Some(record) => Ok(Json(ApiResponse::ok(SessionView {
            session: record.summary(),
        }))),
        None => Err(ApiError::soft(format!(
            "No session stored for {}",
            session_key(&platform.trim().to_lowercase(), account.trim())
        ))),
    }
}
