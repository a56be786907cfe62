//! Per-user session state
//!
//! Each browser gets a random session id in a cookie. The store maps ids to
//! isolated [`SessionState`] values; nothing is shared between sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::navigation::Page;
use crate::services::preprocess::sniff_content_type;
use crate::services::{PredictionError, PredictionResult};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "shm_session";

/// The photo behind the current prediction
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub bytes: Arc<[u8]>,
    pub content_type: &'static str,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        let content_type = sniff_content_type(&bytes).unwrap_or("application/octet-stream");
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }
}

/// Image and result of the last accepted prediction, stored as one unit
#[derive(Debug, Clone, PartialEq)]
struct AcceptedPrediction {
    image: UploadedImage,
    result: PredictionResult,
}

/// State of one user session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: Uuid,
    /// Page currently selected in the sidebar
    pub current_page: Page,
    prediction: Option<AcceptedPrediction>,
    last_seen: DateTime<Utc>,
}

impl SessionState {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            current_page: Page::UploadAndPredict,
            prediction: None,
            last_seen: Utc::now(),
        }
    }

    pub fn last_result(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref().map(|p| &p.result)
    }

    pub fn last_image(&self) -> Option<&UploadedImage> {
        self.prediction.as_ref().map(|p| &p.image)
    }

    pub fn has_prediction(&self) -> bool {
        self.prediction.is_some()
    }

    /// Fold a prediction outcome into the session
    ///
    /// - accepted: image and result are replaced together
    /// - rejected: stored prediction is cleared
    /// - decode/classifier failure: session is left untouched
    pub fn apply_prediction(
        &mut self,
        image: Vec<u8>,
        outcome: &Result<PredictionResult, PredictionError>,
    ) {
        match outcome {
            Ok(result) => {
                self.prediction = Some(AcceptedPrediction {
                    image: UploadedImage::new(image),
                    result: result.clone(),
                });
            }
            Err(PredictionError::Rejected { .. }) => {
                self.prediction = None;
            }
            Err(_) => {}
        }
    }

    fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_seen).to_std().unwrap_or_default()
    }
}

/// Handler-side session identity, inserted by [`session_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

/// All live sessions, keyed by id
///
/// Entries are created on first write and capped at `max_sessions`; past the
/// cap the longest-idle session is evicted.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionState>>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::default(),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Resolve a cookie value to a session id
    ///
    /// A live session is touched and reused. Otherwise a fresh id is handed
    /// out without storing anything; the entry appears on the first
    /// [`update`](Self::update). Returns the id and whether it is new.
    pub async fn resolve(&self, requested: Option<Uuid>) -> (Uuid, bool) {
        if let Some(id) = requested {
            if let Some(session) = self.sessions.write().await.get_mut(&id) {
                session.touch();
                return (id, false);
            }
        }
        (Uuid::new_v4(), true)
    }

    /// Copy of a session's current state; unknown ids read as a new session
    pub async fn snapshot(&self, id: Uuid) -> SessionState {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .cloned()
            .unwrap_or_else(|| SessionState::new(id))
    }

    /// Mutate one session, creating it if needed
    pub async fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut sessions = self.sessions.write().await;

        if !sessions.contains_key(&id) {
            if sessions.len() >= self.max_sessions {
                evict_longest_idle(&mut sessions);
            }
            debug!(session_id = %id, "Session created");
        }

        let session = sessions.entry(id).or_insert_with(|| SessionState::new(id));
        session.touch();
        f(session)
    }

    /// Drop sessions idle longer than `ttl`; returns how many were removed
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for(now) <= ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn evict_longest_idle(sessions: &mut HashMap<Uuid, SessionState>) {
    let oldest = sessions
        .values()
        .min_by_key(|session| session.last_seen)
        .map(|session| session.id);

    if let Some(id) = oldest {
        sessions.remove(&id);
        info!(session_id = %id, "Session cap reached, evicted longest-idle session");
    }
}

/// Periodically discard idle sessions
pub fn spawn_session_sweeper(store: SessionStore, ttl: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = (ttl / 4).max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = store.purge_expired(ttl).await;
            if removed > 0 {
                info!(removed, "Expired sessions discarded");
            }
        }
    })
}

/// Extract the session id from a `Cookie` header value
pub fn session_id_from_cookies(cookies: &str) -> Option<Uuid> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Attach a [`SessionId`] to every request, issuing a cookie when no live session matched
pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let requested = request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(session_id_from_cookies);

    let (id, created) = store.resolve(requested).await;
    request.extensions_mut().insert(SessionId(id));

    let mut response = next.run(request).await;

    if created {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}
