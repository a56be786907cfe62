//! Browser-facing page routes
//!
//! Every handler renders a full HTML document for the session's selected
//! page. Failures inside the workflow (rejected or undecodable photos, a
//! missing prediction) are shown as notices, not as JSON errors.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::navigation::{
    Page, CLASSIFIER_FAILURE_NOTICE, EXPORT_FAILURE_NOTICE, INVALID_IMAGE_NOTICE,
    REJECTION_NOTICE,
};
use crate::render::Notice;
use crate::services::{PredictionError, ReportError};
use crate::session::SessionId;
use crate::AppState;

use super::{read_image_field, run_prediction};

/// GET /
///
/// Renders whichever page the session last selected.
pub async fn show_current_page(
    State(state): State<AppState>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Html<String> {
    let session = state.sessions.snapshot(id).await;
    Html(state.navigation.render(session.current_page, &session, None))
}

/// GET /page/:slug
///
/// Selects a sidebar page and renders it.
pub async fn show_page(
    State(state): State<AppState>,
    Extension(SessionId(id)): Extension<SessionId>,
    Path(slug): Path<String>,
) -> ApiResult<Html<String>> {
    let page = Page::from_slug(&slug)
        .ok_or_else(|| ApiError::NotFound(format!("Page '{}'", slug)))?;

    let session = state
        .sessions
        .update(id, |session| {
            state.navigation.select(session, page);
            session.clone()
        })
        .await;

    Ok(Html(state.navigation.render(page, &session, None)))
}

/// POST /predict
///
/// Classifies the uploaded photo and shows the Upload & Predict page with
/// the outcome.
pub async fn predict_page(
    State(state): State<AppState>,
    Extension(SessionId(id)): Extension<SessionId>,
    multipart: Multipart,
) -> Response {
    let image = match read_image_field(multipart).await {
        Ok(image) => image,
        Err(e) => {
            info!(session_id = %id, "Upload refused: {}", e);
            let notice = Notice::Error(INVALID_IMAGE_NOTICE.to_string());
            return render_upload(&state, id, StatusCode::BAD_REQUEST, Some(notice)).await;
        }
    };

    let (status, notice) = match run_prediction(&state, id, image).await {
        Ok(_) => (StatusCode::OK, None),
        Err(PredictionError::Rejected { .. }) => (
            StatusCode::OK,
            Some(Notice::Warning(REJECTION_NOTICE.to_string())),
        ),
        Err(PredictionError::Decode(_)) => (
            StatusCode::BAD_REQUEST,
            Some(Notice::Error(INVALID_IMAGE_NOTICE.to_string())),
        ),
        Err(PredictionError::Classifier(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Some(Notice::Error(CLASSIFIER_FAILURE_NOTICE.to_string())),
        ),
    };

    render_upload(&state, id, status, notice).await
}

/// Switch to the upload page and render it
async fn render_upload(
    state: &AppState,
    id: Uuid,
    status: StatusCode,
    notice: Option<Notice>,
) -> Response {
    let session = state
        .sessions
        .update(id, |session| {
            state.navigation.select(session, Page::UploadAndPredict);
            session.clone()
        })
        .await;

    let html = state
        .navigation
        .render(Page::UploadAndPredict, &session, notice.as_ref());
    (status, Html(html)).into_response()
}

/// GET /image
///
/// The photo behind the session's current prediction.
pub async fn uploaded_image(
    State(state): State<AppState>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> ApiResult<Response> {
    let session = state.sessions.snapshot(id).await;
    let image = session
        .last_image()
        .ok_or_else(|| ApiError::NotFound("No uploaded image in this session".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, "no-store"),
        ],
        image.bytes.to_vec(),
    )
        .into_response())
}

/// POST /export
///
/// Downloads the report for the current prediction as an attachment.
pub async fn export_report(
    State(state): State<AppState>,
    Extension(SessionId(id)): Extension<SessionId>,
) -> Response {
    let session = state
        .sessions
        .update(id, |session| {
            state.navigation.select(session, Page::ExportReport);
            session.clone()
        })
        .await;

    match state.exporter.export(session.last_result()).await {
        Ok(document) => {
            let disposition = format!("attachment; filename=\"{}\"", document.filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, document.content_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                document.bytes,
            )
                .into_response()
        }
        Err(ReportError::NoPrediction) => {
            // Export page already carries the guard notice when nothing is stored
            info!(session_id = %id, "Export requested without a prediction");
            let html = state.navigation.render(Page::ExportReport, &session, None);
            (StatusCode::CONFLICT, Html(html)).into_response()
        }
        Err(e) => {
            error!(session_id = %id, "Report export failed: {}", e);
            let notice = Notice::Error(EXPORT_FAILURE_NOTICE.to_string());
            let html = state
                .navigation
                .render(Page::ExportReport, &session, Some(&notice));
            (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response()
        }
    }
}
