//! Build identification
//!
//! One compile-time record shared by the startup log, the page footer and
//! `GET /api/buildinfo`.

use std::fmt;

use axum::Json;
use serde::Serialize;

/// Version and build metadata baked in by `build.rs`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
}

pub const BUILD_INFO: BuildInfo = BuildInfo {
    version: env!("CARGO_PKG_VERSION"),
    git_hash: env!("GIT_HASH"),
    build_timestamp: env!("BUILD_TIMESTAMP"),
    build_profile: env!("BUILD_PROFILE"),
};

impl fmt::Display for BuildInfo {
    /// `v0.1.0 (abc12345, release, 2024-03-09T14:05:07Z)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{} ({}, {}, {})",
            self.version, self.git_hash, self.build_profile, self.build_timestamp
        )
    }
}

/// GET /api/buildinfo
pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BUILD_INFO)
}
