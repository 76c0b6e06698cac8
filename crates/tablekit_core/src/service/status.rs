//! Status envelope returned by every table service operation.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for table operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Store, query or transaction failure, passed through unchanged.
    Db(DbError),
    /// No row of `table` has the requested primary key.
    NotFound { table: &'static str, id: String },
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => write!(f, "{table} record not found: {id}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Public table service operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Count,
    IsAvailable,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Count => "count",
            Self::IsAvailable => "is_available",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one service call, tagged with where it came from.
#[derive(Debug)]
pub struct QueryStatus<D> {
    table: &'static str,
    operation: Operation,
    outcome: ServiceResult<D>,
}

impl<D> QueryStatus<D> {
    pub(crate) fn new(table: &'static str, operation: Operation, outcome: ServiceResult<D>) -> Self {
        Self {
            table,
            operation,
            outcome,
        }
    }

    /// Table the originating service is bound to.
    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn data(&self) -> Option<&D> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ServiceError> {
        self.outcome.as_ref().err()
    }

    pub fn into_result(self) -> ServiceResult<D> {
        self.outcome
    }
}
