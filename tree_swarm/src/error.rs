//! Error types for pool construction and the formation field.

use thiserror::Error;

/// Failures raised by [`AgentPool`](crate::pool::AgentPool).
///
/// Both variants are startup-time contract violations: a pool is built
/// once per session and never resized while the render loop is running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A pool was configured with no agents.
    #[error("pool `{pool}` must contain at least one agent")]
    ZeroCount { pool: &'static str },

    /// The pool was traversed before `populate` assigned positions.
    #[error("pool `{pool}` was traversed before it was populated")]
    InvalidPoolState { pool: &'static str },
}

/// Failures raised when building a [`FormationField`](crate::formation::FormationField).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("tree height must be positive and finite (got {0})")]
    InvalidHeight(f32),

    #[error("tree base radius must be non-negative and finite (got {0})")]
    InvalidRadius(f32),
}

pub type PoolResult<T> = Result<T, PoolError>;

/// Anything that can stop a [`Choreographer`](crate::choreographer::Choreographer)
/// from being assembled.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SwarmError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("focus distance must be positive and finite (got {0})")]
    InvalidFocusDistance(f32),
}

pub type SwarmResult<T> = Result<T, SwarmError>;
