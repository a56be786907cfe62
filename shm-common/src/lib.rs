//! # SHM Common Library
//!
//! Shared code for the Soil Health Monitoring services including:
//! - Configuration loading (TOML bootstrap + overrides)
//! - The ordered soil label set
//! - The static soil knowledge base
//! - Common error types

pub mod config;
pub mod error;
pub mod knowledge;
pub mod labels;

pub use error::{Error, Result};
pub use knowledge::{KnowledgeBase, KnowledgeEntry, Region};
pub use labels::LabelSet;
