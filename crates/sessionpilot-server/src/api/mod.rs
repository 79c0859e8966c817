pub mod response;
pub mod run;
pub mod sessions;
pub mod state;

pub use response::{ApiError, ApiResponse};

use axum::{
    Json, Router,
    http::{Method, header},
    routing::{get, post},
};
use serde::Serialize;
use state::AppState;
use tower_http::cors::CorsLayer;

#[derive(Serialize)]
struct Health {
    ok: bool,
    status: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        ok: true,
        status: "sessionpilot is working".to_string(),
    })
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(sessions::save_session))
        .route(
            "/api/sessions/{platform}/{account}",
            get(sessions::get_session),
        )
        .route("/api/run", post(run::run_mode))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use sessionpilot_browser::testkit::ScriptedLauncher;
    use sessionpilot_core::{AppConfig, LocalSessionBackend, SessionStore};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    pub fn local_store() -> (SessionStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = LocalSessionBackend::open(&temp_dir.path().join("sessions.redb")).unwrap();
        (SessionStore::new(Arc::new(backend)), temp_dir)
    }

    pub fn state_with(store: SessionStore, launcher: &ScriptedLauncher) -> AppState {
        AppState::new(AppConfig::default(), store, Arc::new(launcher.clone()))
    }

    pub async fn send(
        state: AppState,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = super::router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sessionpilot_browser::testkit::{ScriptedLauncher, ScriptedPage};

    #[tokio::test]
    async fn test_health() {
        let (store, _tmp) = local_store();
        let launcher = ScriptedLauncher::new(ScriptedPage::new());

        let (status, body) = send(state_with(store, &launcher), "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true, "status": "sessionpilot is working"}));
    }
}
