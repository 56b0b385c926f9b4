//! Error types for document operations.

use thiserror::Error;

/// Document operation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomError {
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),
}
