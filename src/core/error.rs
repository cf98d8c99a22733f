use std::path::PathBuf;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure raised by a single detector on a single frame.
///
/// Never leaves the orchestrator: it is logged and replaced by the
/// detector's neutral result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectorError {
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Missing data: {0}")]
    MissingData(String),
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Video source not found: {0}")]
    NotFound(PathBuf),
    #[error("Cannot open video source {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("Video source has no frames: {0}")]
    Empty(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Report could not be written. Analysis results survive this.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Cannot write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Reference gallery error: {0}")]
    Gallery(String),
}
