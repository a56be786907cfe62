//! Integration tests for shm-ui HTTP routes
//!
//! Tests cover:
//! - Health and build info endpoints
//! - Page guard before any prediction
//! - Accepted, rejected and undecodable uploads (page and JSON routes)
//! - Report export and its precondition
//! - Classifier and report rendering failures
//! - Session isolation by cookie and the session cap
//! - Soil reference lookups
//! - Escaping of configured labels

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use shm_common::config::{ReportFormat, TomlConfig};
use shm_common::{KnowledgeBase, LabelSet};
use shm_ui::classifier::{Classifier, ClassifierError, ImageTensor};
use shm_ui::navigation::{
    CLASSIFIER_FAILURE_NOTICE, EXPORT_FAILURE_NOTICE, GUARD_NOTICE, INVALID_IMAGE_NOTICE,
    REJECTION_NOTICE,
};
use shm_ui::session::SessionStore;
use shm_ui::{build_router, AppState};
use tower::util::ServiceExt; // for `oneshot` method

const BOUNDARY: &str = "shm-test-boundary";

/// Classifier whose output the test can swap between requests
///
/// `None` makes every inference fail.
struct ScriptedClassifier {
    output: Mutex<Option<Vec<f32>>>,
}

impl ScriptedClassifier {
    fn new(output: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            output: Mutex::new(Some(output)),
        })
    }

    fn set(&self, output: Vec<f32>) {
        *self.output.lock().unwrap() = Some(output);
    }

    fn fail(&self) {
        *self.output.lock().unwrap() = None;
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&self, _input: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        self.output
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ClassifierError::Inference("model crashed".to_string()))
    }

    fn output_len(&self) -> usize {
        LabelSet::default().len()
    }
}

/// Distribution over the default labels with `top` on `label`
fn distribution(label: &str, top: f32) -> Vec<f32> {
    let labels = LabelSet::default();
    let index = labels.index_of(label).expect("label in default set");
    let rest = (1.0 - top) / (labels.len() - 1) as f32;
    let mut values = vec![rest; labels.len()];
    values[index] = top;
    values
}

/// Test helper: Create app around a scripted classifier (HTML reports)
fn setup_app(classifier: Arc<ScriptedClassifier>) -> Router {
    setup_app_with(classifier, |_| {}).0
}

/// Test helper: Create app with config tweaks, keeping a handle on the sessions
fn setup_app_with(
    classifier: Arc<ScriptedClassifier>,
    configure: impl FnOnce(&mut TomlConfig),
) -> (Router, SessionStore) {
    let mut config = TomlConfig::default();
    config.report.format = ReportFormat::Html;
    config.classifier.input_size = 16;
    configure(&mut config);

    let state = AppState::new(&config, classifier).expect("Should build app state");
    let sessions = state.sessions.clone();
    (build_router(state), sessions)
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([120, 80, 40]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn multipart_body(bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"soil.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Test helper: Create request, optionally carrying a session cookie
fn test_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn upload_request(uri: &str, image: &[u8], cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(multipart_body(image))).unwrap()
}

/// Test helper: `name=value` part of the Set-Cookie header
fn session_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Should issue session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Upload a photo with a fresh session and return its cookie
async fn predict_new_session(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(upload_request("/predict", &png_bytes(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

// =============================================================================
// Health and build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));

    let response = app.oneshot(test_request("GET", "/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "shm-ui");
    assert_eq!(body["labels"], 11);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));

    let response = app
        .oneshot(test_request("GET", "/api/buildinfo", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_hash"].is_string());
}

#[tokio::test]
async fn test_stylesheet_served() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));

    let response = app
        .oneshot(test_request("GET", "/static/shm.css", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/css; charset=utf-8"
    );
}

// =============================================================================
// Navigation guard
// =============================================================================

#[tokio::test]
async fn test_guarded_page_before_prediction_shows_notice_only() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));

    let response = app
        .oneshot(test_request("GET", "/page/crops", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("shm_session="));

    let html = extract_text(response.into_body()).await;
    assert_eq!(html.matches(GUARD_NOTICE).count(), 1);
    assert!(!html.contains("For <u>"));
}

#[tokio::test]
async fn test_unknown_page_is_not_found() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));

    let response = app
        .oneshot(test_request("GET", "/page/settings", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_root_renders_last_selected_page() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));
    let cookie = predict_new_session(&app).await;

    let response = app
        .clone()
        .oneshot(test_request("GET", "/page/tips", Some(&cookie)))
        .await
        .unwrap();
    let selected = extract_text(response.into_body()).await;

    let response = app
        .oneshot(test_request("GET", "/", Some(&cookie)))
        .await
        .unwrap();
    let root = extract_text(response.into_body()).await;

    assert!(root.contains(r#"<a href="/page/tips" class="active">"#));
    assert_eq!(root, selected);
}

// =============================================================================
// Prediction workflow
// =============================================================================

#[tokio::test]
async fn test_accepted_prediction_unlocks_pages() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));

    let response = app
        .clone()
        .oneshot(upload_request("/predict", &png_bytes(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let html = extract_text(response.into_body()).await;
    assert!(html.contains("Detected Soil Type: Clay (90.00% confidence)"));
    assert!(html.contains(r#"<img src="/image""#));
    assert!(html.contains("<svg"));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/page/crops", Some(&cookie)))
        .await
        .unwrap();
    let html = extract_text(response.into_body()).await;
    assert!(html.contains(KnowledgeBase::builtin().get("Clay").crops));
    assert!(!html.contains(GUARD_NOTICE));

    let response = app
        .oneshot(test_request("GET", "/image", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), png_bytes().as_slice());
}

#[tokio::test]
async fn test_rejected_prediction_clears_session() {
    let classifier = ScriptedClassifier::new(distribution("Loam", 0.8));
    let app = setup_app(classifier.clone());
    let cookie = predict_new_session(&app).await;

    classifier.set(distribution("Sand", 0.45));
    let response = app
        .clone()
        .oneshot(upload_request("/predict", &png_bytes(), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = extract_text(response.into_body()).await;
    assert!(html.contains(REJECTION_NOTICE));
    assert!(!html.contains("Detected Soil Type"));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/page/fertilizers", Some(&cookie)))
        .await
        .unwrap();
    let html = extract_text(response.into_body()).await;
    assert!(html.contains(GUARD_NOTICE));

    let response = app
        .oneshot(test_request("GET", "/image", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_top_label_is_rejected() {
    let app = setup_app(ScriptedClassifier::new(distribution("Unknown", 0.95)));

    let response = app
        .oneshot(upload_request("/predict", &png_bytes(), None))
        .await
        .unwrap();

    let html = extract_text(response.into_body()).await;
    assert!(html.contains(REJECTION_NOTICE));
}

#[tokio::test]
async fn test_undecodable_upload_keeps_previous_prediction() {
    let app = setup_app(ScriptedClassifier::new(distribution("Peat", 0.7)));
    let cookie = predict_new_session(&app).await;

    let response = app
        .clone()
        .oneshot(upload_request("/predict", b"not an image", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = extract_text(response.into_body()).await;
    assert!(html.contains(INVALID_IMAGE_NOTICE));

    let response = app
        .oneshot(test_request("GET", "/api/session", Some(&cookie)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["prediction"]["label"], "Peat");
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let app = setup_app(ScriptedClassifier::new(distribution("Chalk", 0.85)));
    let _predicted = predict_new_session(&app).await;

    let response = app
        .oneshot(test_request("GET", "/api/session", None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body.get("prediction").is_none());
    assert_eq!(body["current_page_slug"], "upload");
}

#[tokio::test]
async fn test_json_prediction_accepted() {
    let app = setup_app(ScriptedClassifier::new(distribution("Laterite Soil", 0.75)));

    let response = app
        .oneshot(upload_request("/api/predict", &png_bytes(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["label"], "Laterite Soil");
    assert_eq!(body["confidence_display"], "75.00%");
    assert_eq!(body["labels"].as_array().unwrap().len(), 11);
    assert_eq!(body["raw_distribution"].as_array().unwrap().len(), 11);
}

#[tokio::test]
async fn test_json_prediction_rejected() {
    let app = setup_app(ScriptedClassifier::new(distribution("Silt", 0.3)));

    let response = app
        .oneshot(upload_request("/api/predict", &png_bytes(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "REJECTED");
}

// =============================================================================
// Report export
// =============================================================================

#[tokio::test]
async fn test_export_without_prediction_is_refused() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));

    let response = app
        .oneshot(test_request("POST", "/export", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
    let html = extract_text(response.into_body()).await;
    assert!(html.contains(GUARD_NOTICE));
}

#[tokio::test]
async fn test_export_downloads_report_for_prediction() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));
    let cookie = predict_new_session(&app).await;

    let response = app
        .oneshot(test_request("POST", "/export", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"Clay_"));
    assert!(disposition.ends_with(".html\""));

    let html = extract_text(response.into_body()).await;
    let entry = KnowledgeBase::builtin().get("Clay");
    assert!(html.contains("90.00%"));
    assert!(html.contains(entry.crops));
    assert!(html.contains(entry.tips));
}

// =============================================================================
// Soil reference data
// =============================================================================

#[tokio::test]
async fn test_soil_lookup() {
    let app = setup_app(ScriptedClassifier::new(distribution("Clay", 0.9)));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/soils/Alluvial%20Soil", None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["found"], true);
    assert_eq!(body["entry"]["label"], "Alluvial Soil");

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/soils/Basalt", None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["found"], false);
    assert_eq!(body["label"], "Basalt");

    let response = app
        .oneshot(test_request("GET", "/api/soils", None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_classifier_failure_keeps_previous_prediction() {
    let classifier = ScriptedClassifier::new(distribution("Clay", 0.9));
    let app = setup_app(classifier.clone());
    let cookie = predict_new_session(&app).await;

    classifier.fail();
    let response = app
        .clone()
        .oneshot(upload_request("/predict", &png_bytes(), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let html = extract_text(response.into_body()).await;
    assert!(html.contains(CLASSIFIER_FAILURE_NOTICE));

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/session", Some(&cookie)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["prediction"]["label"], "Clay");

    let response = app
        .oneshot(upload_request("/api/predict", &png_bytes(), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_pdf_rendering_failure_shows_notice_and_keeps_prediction() {
    let (app, _) = setup_app_with(ScriptedClassifier::new(distribution("Clay", 0.9)), |config| {
        config.report.format = ReportFormat::Pdf;
        config.report.wkhtmltopdf_path = "/nonexistent/wkhtmltopdf".into();
    });
    let cookie = predict_new_session(&app).await;

    let response = app
        .clone()
        .oneshot(test_request("POST", "/export", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
    let html = extract_text(response.into_body()).await;
    assert!(html.contains(EXPORT_FAILURE_NOTICE));

    let response = app
        .oneshot(test_request("GET", "/api/session", Some(&cookie)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["prediction"]["label"], "Clay");
    assert_eq!(body["current_page_slug"], "export");
}

// =============================================================================
// Session retention
// =============================================================================

#[tokio::test]
async fn test_cookieless_reads_retain_no_sessions() {
    let (app, sessions) = setup_app_with(ScriptedClassifier::new(distribution("Clay", 0.9)), |_| {});

    for _ in 0..25 {
        let response = app
            .clone()
            .oneshot(test_request("GET", "/", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app
            .clone()
            .oneshot(test_request("GET", "/api/session", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(sessions.len().await, 0);
}

#[tokio::test]
async fn test_cookieless_uploads_are_capped() {
    let (app, sessions) = setup_app_with(ScriptedClassifier::new(distribution("Clay", 0.9)), |config| {
        config.max_sessions = 8;
    });

    for _ in 0..40 {
        let response = app
            .clone()
            .oneshot(upload_request("/predict", &png_bytes(), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(sessions.len().await, 8);
}

#[tokio::test]
async fn test_returning_session_survives_cap_churn() {
    let (app, _) = setup_app_with(ScriptedClassifier::new(distribution("Peat", 0.8)), |config| {
        config.max_sessions = 4;
    });
    let cookie = predict_new_session(&app).await;

    for _ in 0..2 {
        app.clone()
            .oneshot(upload_request("/predict", &png_bytes(), None))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(test_request("GET", "/api/session", Some(&cookie)))
        .await
        .unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["prediction"]["label"], "Peat");
}

// =============================================================================
// Configured labels
// =============================================================================

#[tokio::test]
async fn test_configured_labels_are_escaped_in_pages_and_filename() {
    let defaults = LabelSet::default();
    let mut labels: Vec<String> = defaults.iter().map(str::to_string).collect();
    labels[defaults.index_of("Clay").unwrap()] = r#"Clay "heavy" <b>"#.to_string();
    let (app, _) = setup_app_with(ScriptedClassifier::new(distribution("Clay", 0.9)), |config| {
        config.labels = Some(labels);
    });

    let response = app
        .clone()
        .oneshot(upload_request("/predict", &png_bytes(), None))
        .await
        .unwrap();
    let cookie = session_cookie(&response);
    let html = extract_text(response.into_body()).await;
    assert!(html.contains("Detected Soil Type: Clay &quot;heavy&quot; &lt;b&gt; (90.00% confidence)"));
    assert!(!html.contains("<b>"));

    let response = app
        .oneshot(test_request("POST", "/export", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"Clay_heavy_b_"));
    assert_eq!(disposition.matches('"').count(), 2);
}
