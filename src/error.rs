//! Error types for the pagination engine
//!
//! Geometry misses, layout jitter and overflow-insertion failures are not
//! errors: they are absorbed, logged and counted. What remains here are the
//! conditions a caller can act on.

use crate::host::NodeId;
use thiserror::Error;

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("margin `{name}` must be non-negative, got {value}")]
    NegativeMargin { name: &'static str, value: f32 },
    #[error("minimum media height must be positive, got {0}")]
    MinMediaHeight(f32),
    #[error("class name for `{0}` must not be empty")]
    EmptyClass(&'static str),
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// The unified error type returned by public engine commands
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PagerError {
    /// The container is hidden or has zero size; the work is deferred
    #[error("container is not visible")]
    NotVisible,
    /// Layout produced a page geometry that cannot be paginated
    #[error("invalid page geometry: width {width}, height {height}, page length {page_length}")]
    InvalidGeometry {
        width: f32,
        height: f32,
        page_length: f32,
    },
    #[error("no book registered with id {0}")]
    UnknownBook(u32),
    #[error("book is not in print mode")]
    NotInPrintMode,
    #[error("another container is already in print mode")]
    AlreadyInPrintMode,
    #[error("node {0:?} is no longer attached to the content tree")]
    Detached(NodeId),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}
