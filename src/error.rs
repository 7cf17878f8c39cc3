//! Error Types
//!
//! Query evaluation, ingestion and configuration failures.
//! The optimizer never fails; every `QueryError` is raised during evaluation.

use thiserror::Error;

use crate::data::Pre;
use crate::query::SetOp;

/// Result type for query evaluation
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type for database updates
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Failure kinds reported by `QueryError::kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidToken,
    StoreUnavailable,
    Interrupted,
    IndexInconsistent,
    InvalidNode,
}

/// Query evaluation error
#[derive(Debug, Error)]
pub enum QueryError {
    /// Range token with `min > max`
    #[error("invalid index token {token}: {reason}")]
    InvalidToken { token: String, reason: &'static str },

    /// The bound snapshot was dropped between compilation and evaluation
    #[error("database \"{name}\" is no longer available")]
    StoreUnavailable { name: String },

    /// Cancellation was requested through the query's interrupt handle
    #[error("query was interrupted")]
    Interrupted,

    /// The value index returned an entry that does not satisfy the lookup
    #[error("index returned inconsistent entry {pre} for {token}: {reason}")]
    IndexInconsistent {
        token: String,
        pre: Pre,
        reason: &'static str,
    },

    /// Literal node reference outside of the snapshot
    #[error("node {pre} is out of range for database \"{name}\" ({size} nodes)")]
    InvalidNode { name: String, pre: Pre, size: usize },

    /// Failure raised by one operand of a set operator
    #[error("{operator} operand {operand}: {source}")]
    Operand {
        operator: SetOp,
        operand: usize,
        #[source]
        source: Box<QueryError>,
    },
}

impl QueryError {
    /// Underlying failure kind, ignoring operand context
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::InvalidToken { .. } => ErrorKind::InvalidToken,
            QueryError::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            QueryError::Interrupted => ErrorKind::Interrupted,
            QueryError::IndexInconsistent { .. } => ErrorKind::IndexInconsistent,
            QueryError::InvalidNode { .. } => ErrorKind::InvalidNode,
            QueryError::Operand { source, .. } => source.kind(),
        }
    }

    /// Attach set operator context. Interrupts abort the whole query and stay bare.
    pub(crate) fn in_operand(self, operator: SetOp, operand: usize) -> Self {
        match self {
            QueryError::Interrupted => QueryError::Interrupted,
            other => QueryError::Operand {
                operator,
                operand,
                source: Box::new(other),
            },
        }
    }
}

/// Fragment building error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("attribute \"{0}\" must directly follow an element start")]
    MisplacedAttribute(String),
    #[error("no open element to close")]
    UnbalancedClose,
    #[error("{0} element(s) left open")]
    Unclosed(usize),
}

/// Database update error
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("invalid name: \"{0}\"")]
    NameInvalid(String),
    #[error("database \"{0}\" is being updated by another writer")]
    Busy(String),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Option parsing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option \"{0}\"")]
    Unknown(String),
    #[error("invalid value \"{value}\" for option {name}")]
    InvalidValue { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_sees_through_operands() {
        let err = QueryError::StoreUnavailable { name: "db".into() }
            .in_operand(SetOp::Union, 1)
            .in_operand(SetOp::Except, 0);
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

        let display = err.to_string();
        assert!(display.starts_with("except operand 0"));
        assert!(display.contains("union operand 1"));
        assert!(display.contains("\"db\""));
    }

    #[test]
    fn test_interrupt_is_not_wrapped() {
        let err = QueryError::Interrupted.in_operand(SetOp::Intersect, 2);
        assert!(matches!(err, QueryError::Interrupted));
    }
}
