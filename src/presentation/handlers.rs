// HTTP request handlers
use crate::domain::error::{AggregateFailure, IntensityError};
use crate::domain::granularity::Granularity;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Average intensity by hour of day over the full history
pub async fn daily_intensity(
    Path(utility): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state
        .intensity_service
        .intensity(&utility, Granularity::Hourly)
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(failure) => failure.into_response(),
    }
}

/// `by_hour`, `by_month`, `by_month_and_weekday` or a granularity name
pub async fn daily_intensity_by(
    Path((utility, granularity)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state
        .intensity_service
        .daily_intensity(&utility, &granularity)
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(failure) => failure.into_response(),
    }
}

pub async fn carbon_intensity_factors(
    Path(utility): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.intensity_service.factors(&utility) {
        Ok(table) => Json(table.summary()).into_response(),
        Err(e) => (status_for(&e), Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

fn status_for(error: &IntensityError) -> StatusCode {
    match error {
        IntensityError::Configuration(_) => StatusCode::NOT_FOUND,
        IntensityError::UnsupportedGranularity(_) => StatusCode::BAD_REQUEST,
        IntensityError::DataSource(_) => StatusCode::BAD_GATEWAY,
        IntensityError::DivisionEdgeCase(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for AggregateFailure {
    fn into_response(self) -> Response {
        let status = status_for(&self.source);
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = json!({
            "error": self.to_string(),
            "utility": self.utility,
            "granularity": self.granularity,
        });
        (status, Json(body)).into_response()
    }
}
