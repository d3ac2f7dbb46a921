use std::io;

use thiserror::Error;
use uuid::Uuid;

use crate::currency::Money;
use crate::domain::ExpenseStatus;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error type that captures ledger, budget and persistence failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Invalid transition: cannot {action} an expense that is {from}")]
    InvalidTransition {
        action: &'static str,
        from: ExpenseStatus,
    },
    #[error("Payment of {attempted} exceeds the remaining balance of {remaining}")]
    Overpayment { attempted: Money, remaining: Money },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("Persistence error: {message}")]
    Persistence { message: String, transient: bool },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        LedgerError::Persistence {
            message: message.into(),
            transient: false,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        LedgerError::Persistence {
            message: message.into(),
            transient: true,
        }
    }

    /// True only for persistence failures worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::Persistence {
                transient: true,
                ..
            }
        )
    }
}

impl From<io::Error> for LedgerError {
    fn from(err: io::Error) -> Self {
        let transient = matches!(
            err.kind(),
            io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
        );
        LedgerError::Persistence {
            message: err.to_string(),
            transient,
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::persistence(err.to_string())
    }
}
