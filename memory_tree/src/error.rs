//! Error types for the sensor, configuration and application layers.

use std::path::PathBuf;

use thiserror::Error;

use tree_swarm::SwarmError;

/// Landmark source failures.
///
/// None of these are fatal: the pipeline reports them as an `ERROR: …`
/// status line and carries on as if no hand were visible.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("CAMERA UNAVAILABLE ({0})")]
    Unavailable(String),

    #[error("CAMERA PERMISSION DENIED")]
    PermissionDenied,

    #[error("MODEL FAILED ({0})")]
    ClassifierInit(String),

    #[error("SENSOR DISCONNECTED")]
    Disconnected,

    #[error("EXPECTED {expected} LANDMARKS, GOT {got}")]
    MalformedFrame { expected: usize, got: usize },
}

/// Startup configuration failures. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config `{path}`: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config `{path}`: {source}")]
    Parse {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Anything that ends [`run`](crate::app::run) early.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Swarm(#[from] SwarmError),

    #[error("window: {0}")]
    Window(String),

    #[error("pipeline thread: {0}")]
    Pipeline(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type AppResult<T>    = Result<T, AppError>;
