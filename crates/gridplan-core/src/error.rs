//! Error taxonomy for the gridplan workspace
//!
//! [`GridError`] separates the two failure classes the evaluation engine
//! cares about:
//!
//! - [`GridError::MalformedInput`]: an [`Instance`](crate::Instance) or
//!   [`Solution`](crate::Solution) breaks a structural invariant (dangling
//!   reference, negative demand, duplicate id).
//! - [`GridError::Constraint`]: a precondition of a computation is violated
//!   while it runs (e.g. aggregation meets a flow above the link capacity).
//!
//! An infeasible solution is *not* an error. Feasibility is reported as a
//! normal result by the evaluator crate.
//!
//! # Example
//!
//! ```ignore
//! use gridplan_core::{GridError, GridResult};
//!
//! fn load_and_check(path: &str) -> GridResult<()> {
//!     let instance = gridplan_core::io::read_instance(path)?;
//!     instance.topology_diagnostics();
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for instance/solution handling and evaluation.
#[derive(Error, Debug)]
pub enum GridError {
    /// Instance or solution violates a structural invariant
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A computation precondition failed mid-evaluation
    #[error("Constraint error: {0}")]
    Constraint(String),

    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Evaluation policy errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

impl GridError {
    /// Shorthand used by validators.
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        GridError::MalformedInput(message.into())
    }

    /// True for [`GridError::MalformedInput`].
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, GridError::MalformedInput(_))
    }

    /// True for [`GridError::Constraint`].
    pub fn is_constraint(&self) -> bool {
        matches!(self, GridError::Constraint(_))
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for GridError {
    fn from(err: toml::de::Error) -> Self {
        GridError::Config(err.to_string())
    }
}
