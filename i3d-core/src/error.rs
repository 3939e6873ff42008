/// Error types for parsing, loading and viewer operations
use thiserror::Error;

/// Errors produced while decoding STL data
#[derive(Debug, Error, PartialEq)]
pub enum StlError {
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),

    #[error("unexpected end of file: expected {expected} bytes for {triangles} triangles, got {actual}")]
    Truncated {
        triangles: usize,
        expected: usize,
        actual: usize,
    },

    #[error("failed to parse ASCII STL near: {0:?}")]
    InvalidAscii(String),
}

/// Errors a format loader can report for a single request
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read model source: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch model bytes: {0}")]
    Fetch(String),

    #[error(transparent)]
    Stl(#[from] StlError),

    #[error("model contains no triangles")]
    EmptyMesh,
}

/// Errors surfaced to callers of the model lifecycle
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("unsupported model format: {0:?}")]
    UnsupportedFormat(String),

    #[error("model load failed: {0}")]
    Load(#[from] LoadError),
}

/// Errors raised while configuring the orbit controller
#[derive(Debug, Error, PartialEq)]
pub enum ControlsError {
    #[error("invalid distance range: min {min} must be positive and not above max {max}")]
    InvalidDistanceRange { min: f32, max: f32 },

    #[error("camera position coincides with the orbit target")]
    DegenerateCamera,
}
