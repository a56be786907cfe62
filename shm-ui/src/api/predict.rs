//! JSON prediction API
//!
//! Same workflow as the upload page, for scripted clients. The session
//! cookie still applies, so a JSON prediction is visible to the pages.

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use serde::Serialize;

use crate::error::ApiResult;
use crate::navigation::Page;
use crate::services::report::format_confidence;
use crate::services::PredictionResult;
use crate::session::SessionId;
use crate::AppState;

use super::{read_image_field, run_prediction};

/// Accepted prediction response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: String,
    pub confidence: f32,
    /// Confidence as shown on the pages ("92.31%")
    pub confidence_display: String,
    /// Label order of `raw_distribution`
    pub labels: Vec<String>,
    pub raw_distribution: Vec<f32>,
}

/// POST /api/predict
///
/// Multipart upload with an `image` field. Rejected photos yield 422 and
/// clear the session's stored prediction.
pub async fn predict_json(
    State(state): State<AppState>,
    Extension(SessionId(id)): Extension<SessionId>,
    multipart: Multipart,
) -> ApiResult<Json<PredictResponse>> {
    let image = read_image_field(multipart).await?;
    let result = run_prediction(&state, id, image).await?;

    Ok(Json(PredictResponse {
        confidence_display: format_confidence(result.confidence),
        labels: state.predictor.labels().iter().map(str::to_string).collect(),
        label: result.label,
        confidence: result.confidence,
        raw_distribution: result.raw_distribution,
    }))
}

/// Session summary response
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub current_page: Page,
    /// Slug of `current_page` (`/page/<slug>`)
    pub current_page_slug: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionResult>,
}

/// GET /api/session
pub async fn session_summary(
    State(state): State<AppState>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Json<SessionSummary> {
    let session = state.sessions.snapshot(id).await;

    Json(SessionSummary {
        session_id: id.to_string(),
        current_page: session.current_page,
        current_page_slug: session.current_page.slug(),
        prediction: session.last_result().cloned(),
    })
}
