//! Static asset routes

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

const SHM_CSS: &str = include_str!("../../static/shm.css");

/// GET /static/shm.css
pub async fn serve_shm_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        SHM_CSS,
    )
        .into_response()
}
