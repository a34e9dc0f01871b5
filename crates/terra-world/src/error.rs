//! Precondition failures raised by the generation functions.

use thiserror::Error;

/// Failure of a pure generation step. Reported by value across the worker boundary.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TerrainError {
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("invalid LOD: {0}")]
    InvalidLod(String),

    #[error("invalid noise parameters: {0}")]
    InvalidNoiseParams(String),
}
