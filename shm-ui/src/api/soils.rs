//! Soil reference data API

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use shm_common::KnowledgeEntry;

use crate::AppState;

/// GET /api/soils
///
/// Every soil type with reference data, in table order.
pub async fn list_soils(State(state): State<AppState>) -> Json<&'static [KnowledgeEntry]> {
    Json(state.knowledge.entries())
}

/// Lookup response; unknown labels carry the default entry
#[derive(Debug, Serialize)]
pub struct SoilLookup {
    pub label: String,
    /// False when `entry` is the placeholder for labels without data
    pub found: bool,
    pub entry: &'static KnowledgeEntry,
}

/// GET /api/soils/:label
pub async fn get_soil(State(state): State<AppState>, Path(label): Path<String>) -> Json<SoilLookup> {
    let entry = state.knowledge.get(&label);
    Json(SoilLookup {
        found: !entry.is_default(),
        label,
        entry,
    })
}
