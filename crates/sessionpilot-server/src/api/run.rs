use crate::api::{ApiError, ApiResponse, state::AppState};
use crate::modes::{self, Mode, ModeOutput, RunRequest};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub mode: &'static str,
    #[serde(flatten)]
    pub output: ModeOutput,
}

// POST /api/run
pub async fn run_mode(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RunOutput>>, ApiError> {
    let Json(request) = payload?;
    let mode = Mode::parse(&request.mode).map_err(ApiError::from)?;

    match modes::dispatch(&state, mode, &request).await {
        Ok(output) => Ok(Json(ApiResponse::ok(RunOutput {
            mode: mode.as_str(),
            output,
        }))),
        Err(error) => Err(ApiError::from(error).with_mode(mode.as_str())),
    }
}
