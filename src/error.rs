//! Error types for fetchscope

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using fetchscope's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fetchscope
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors raised by the underlying transport. These are handed back to the
/// caller exactly as the transport produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Upstream request failed: {0}")]
    UpstreamRequest(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Failures while classifying or decoding a body. Never propagated past the
/// capture layer; they end up as an error marker on the span.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to read body: {0}")]
    Body(String),
}
