//! Error types shared by every pipeline stage.

use std::fmt;

use thiserror::Error;

use crate::models::GeoPoint;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no boundary polygon for neighborhood '{neighborhood}'")]
    NotFound { neighborhood: String },

    #[error("point sampling gave up after {attempts} attempts")]
    SamplingTimeout { attempts: usize },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("{stage} failed for row {row} (client {client_id}): {source}")]
    Row {
        row: usize,
        client_id: String,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    #[error("address references unknown client '{0}'")]
    UnknownClient(String),

    #[error("projection error: {0}")]
    Projection(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Wrap a per-row failure with the stage and record it belongs to.
    pub fn at_row(self, row: usize, client_id: &str, stage: Stage) -> Self {
        Error::Row {
            row,
            client_id: client_id.to_string(),
            stage,
            source: Box::new(self),
        }
    }
}

/// Pipeline stage a per-row failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sampling,
    Resolution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Sampling => write!(f, "sampling"),
            Stage::Resolution => write!(f, "address resolution"),
        }
    }
}

/// A reverse-geocoding failure for one point.
#[derive(Debug, Clone, Error)]
#[error("reverse geocoding failed at {point}: {kind}")]
pub struct ResolutionError {
    pub point: GeoPoint,
    pub kind: ResolutionErrorKind,
}

impl ResolutionError {
    pub fn new(point: GeoPoint, kind: ResolutionErrorKind) -> Self {
        Self { point, kind }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionErrorKind {
    /// Request exceeded its timeout
    Timeout,
    /// Connection-level failure
    Transport(String),
    /// Non-success HTTP status
    Status(u16),
    /// Body could not be decoded into the expected shape
    Malformed(String),
    /// Service answered, but had no address for the point
    NoResult(String),
}

impl ResolutionErrorKind {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ResolutionErrorKind::Timeout | ResolutionErrorKind::Transport(_) => true,
            ResolutionErrorKind::Status(code) => *code == 429 || *code >= 500,
            ResolutionErrorKind::Malformed(_) | ResolutionErrorKind::NoResult(_) => false,
        }
    }
}

impl fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionErrorKind::Timeout => write!(f, "request timed out"),
            ResolutionErrorKind::Transport(msg) => write!(f, "transport error: {}", msg),
            ResolutionErrorKind::Status(code) => write!(f, "service returned status {}", code),
            ResolutionErrorKind::Malformed(msg) => write!(f, "malformed response: {}", msg),
            ResolutionErrorKind::NoResult(msg) => write!(f, "no result: {}", msg),
        }
    }
}
