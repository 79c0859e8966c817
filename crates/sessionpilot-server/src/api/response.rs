use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sessionpilot_core::AutomationError;
use tracing::warn;

/// Success envelope: `{"ok": true, "message"?: ..., ...data}`.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            message: None,
            data: Some(data),
        }
    }
}

/// Failure envelope. Validation failures are answered with 400, every other
/// failure with a 200 `{"ok": false, "message": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    mode: Option<String>,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<&'a str>,
    message: &'a str,
}

impl ApiError {
    /// Soft failure reported with a 200 status.
    pub fn soft(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            mode: None,
            message: message.into(),
        }
    }

    pub fn with_mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.to_string());
        self
    }
}

impl From<AutomationError> for ApiError {
    fn from(error: AutomationError) -> Self {
        let status = if error.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };
        Self {
            status,
            mode: None,
            message: error.to_string(),
        }
    }
}

/// Malformed or mistyped request bodies are client errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            mode: None,
            message: format!("invalid request body: {}", rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(
            status = self.status.as_u16(),
            mode = self.mode.as_deref().unwrap_or("-"),
            message = %self.message,
            "Request failed"
        );
        let body = ErrorBody {
            ok: false,
            mode: self.mode.as_deref(),
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Saved {
        count: usize,
    }

    #[test]
    fn test_ok_flattens_data() {
        let value = serde_json::to_value(ApiResponse::ok(Saved { count: 2 })).unwrap();
        assert_eq!(value, json!({"ok": true, "count": 2}));
    }

    #[test]
    fn test_status_follows_error_kind() {
        let client: ApiError = AutomationError::validation("videoUrl is required").into();
        assert_eq!(client.status, StatusCode::BAD_REQUEST);

        let soft: ApiError = AutomationError::Configuration("no store".into()).into();
        assert_eq!(soft.status, StatusCode::OK);
    }
}
