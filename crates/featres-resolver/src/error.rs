use std::path::PathBuf;

use featres_version::VersionError;
use thiserror::Error;

/// Fatal faults. Resolution diagnostics are never reported through this type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Duplicate feature \"{0}\" in catalog")]
    DuplicateFeature(String),

    #[error("Duplicate platform \"{0}\" in catalog")]
    DuplicatePlatform(String),

    #[error("Invalid feature \"{name}\": {reason}")]
    InvalidFeature { name: String, reason: String },

    #[error("Invalid platform \"{name}\": {reason}")]
    InvalidPlatform { name: String, reason: String },

    #[error("Malformed resolution request: {0}")]
    Request(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
