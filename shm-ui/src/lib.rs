//! shm-ui library - Soil Health Monitoring web service
//!
//! Classifies uploaded soil photos and serves the matching agronomic
//! guidance, regional map, probability chart and downloadable report.

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use shm_common::config::TomlConfig;
use shm_common::KnowledgeBase;

pub mod api;
pub mod classifier;
pub mod error;
pub mod navigation;
pub mod render;
pub mod services;
pub mod session;

use classifier::{Classifier, ClassifierError};
use navigation::NavigationController;
use services::{AcceptancePolicy, PredictionService, ReportExporter, ReportRenderer};
use session::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Classifier plus label set and acceptance policy
    pub predictor: Arc<PredictionService>,
    pub navigation: Arc<NavigationController>,
    pub exporter: Arc<ReportExporter>,
    pub sessions: SessionStore,
    /// Static soil reference data
    pub knowledge: &'static KnowledgeBase,
    /// Largest accepted request body for uploads
    pub max_upload_bytes: usize,
    /// Service startup timestamp (for uptime reporting)
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire services from configuration around a loaded classifier
    ///
    /// Fails when the classifier's output size does not match the configured
    /// labels.
    pub fn new(config: &TomlConfig, classifier: Arc<dyn Classifier>) -> Result<Self, ClassifierError> {
        let labels = config
            .label_set()
            .map_err(|e| ClassifierError::Load(e.to_string()))?;
        let knowledge = KnowledgeBase::builtin();

        let predictor = PredictionService::new(
            classifier,
            labels.clone(),
            AcceptancePolicy::from(&config.acceptance),
            config.classifier.input_size,
        )?;
        let navigation = NavigationController::new(knowledge, labels, config.map.mode);
        let exporter = ReportExporter::new(ReportRenderer::from(&config.report), knowledge);

        Ok(Self {
            predictor: Arc::new(predictor),
            navigation: Arc::new(navigation),
            exporter: Arc::new(exporter),
            sessions: SessionStore::new(config.max_sessions),
            knowledge,
            max_upload_bytes: config.max_upload_bytes,
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
///
/// Page and prediction routes run behind the session middleware; health,
/// build info, reference data and static assets do not.
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    // Routes bound to a user session
    let session_scoped = Router::new()
        .route("/", get(api::show_current_page))
        .route("/page/:slug", get(api::show_page))
        .route("/predict", post(api::predict_page))
        .route("/image", get(api::uploaded_image))
        .route("/export", post(api::export_report))
        .route("/api/predict", post(api::predict_json))
        .route("/api/session", get(api::session_summary))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session::session_middleware,
        ));

    // Stateless routes
    let public = Router::new()
        .route("/api/soils", get(api::list_soils))
        .route("/api/soils/:label", get(api::get_soil))
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/static/shm.css", get(api::serve_shm_css))
        .merge(api::health_routes());

    Router::new()
        .merge(session_scoped)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
