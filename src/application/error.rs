//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Another writer committed since this transaction took its snapshot.
    #[error("concurrent modification: ledger moved from revision {expected} to {found}, retry the operation")]
    Conflict { expected: u64, found: u64 },

    /// The store refused a write that would break referential integrity.
    #[error("constraint violation: {message}")]
    Constraint { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, delegating to the domain for rule violations.
    pub fn code(&self) -> &'static str {
        match self {
            ApplicationError::Domain(e) => e.code(),
            ApplicationError::Conflict { .. } => "conflict",
            ApplicationError::Constraint { .. } => "constraint_violation",
            ApplicationError::Config { .. } => "config_error",
            ApplicationError::OperationFailed { .. } => "operation_failed",
        }
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ApplicationError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
