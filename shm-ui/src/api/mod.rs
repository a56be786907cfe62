//! HTTP API handlers for shm-ui

pub mod buildinfo;
pub mod health;
pub mod pages;
pub mod predict;
pub mod soils;
pub mod ui;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use pages::{export_report, predict_page, show_current_page, show_page, uploaded_image};
pub use predict::{predict_json, session_summary};
pub use soils::{get_soil, list_soils};
pub use ui::serve_shm_css;

use axum::extract::Multipart;
use tracing::{error, warn};
use uuid::Uuid;

use crate::classifier::ClassifierError;
use crate::error::ApiError;
use crate::services::{PredictionError, PredictionResult};
use crate::AppState;

/// Multipart field carrying the photo
pub const IMAGE_FIELD: &str = "image";

/// Pull the photo bytes out of an upload form
///
/// Takes the field named `image`, or the first file field when no field has
/// that name.
pub async fn read_image_field(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    let mut fallback = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let is_image = field.name() == Some(IMAGE_FIELD);
        let is_file = field.file_name().is_some();
        if !is_image && (!is_file || fallback.is_some()) {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Upload read failed: {}", e)))?;

        if is_image {
            return Ok(bytes.to_vec());
        }
        fallback = Some(bytes.to_vec());
    }

    fallback.ok_or_else(|| ApiError::BadRequest(format!("Missing '{}' field", IMAGE_FIELD)))
}

/// Classify `image` off the async runtime and fold the outcome into the session
pub async fn run_prediction(
    state: &AppState,
    session_id: Uuid,
    image: Vec<u8>,
) -> Result<PredictionResult, PredictionError> {
    let predictor = state.predictor.clone();
    let input = image.clone();
    let outcome = tokio::task::spawn_blocking(move || predictor.predict(&input))
        .await
        .unwrap_or_else(|e| {
            Err(PredictionError::Classifier(ClassifierError::Inference(format!(
                "Inference task failed: {}",
                e
            ))))
        });

    match &outcome {
        Ok(_) => {}
        Err(PredictionError::Rejected { label, confidence }) => {
            warn!(session_id = %session_id, label = %label, confidence, "Upload rejected");
        }
        Err(PredictionError::Decode(msg)) => {
            warn!(session_id = %session_id, "Undecodable upload: {}", msg);
        }
        Err(PredictionError::Classifier(e)) => {
            error!(session_id = %session_id, "Classification failed: {}", e);
        }
    }

    state
        .sessions
        .update(session_id, |session| session.apply_prediction(image, &outcome))
        .await;

    outcome
}
