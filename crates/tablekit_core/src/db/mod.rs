//! SQLite storage bootstrap and unit-of-work entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for table services.
//! - Own the session (unit of work) shared by every mutating call.
//! - Define the store-layer error surfaced by queries and sessions.
//!
//! # Invariants
//! - Schema management is owned by the caller; nothing here creates tables.
//! - Every store failure is reported as `DbError`, never swallowed.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod session;

pub use open::{open_db, open_db_in_memory};
pub use session::Session;

pub type DbResult<T> = Result<T, DbError>;

/// Store-layer error for connection, query and session operations.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Table or column name that cannot be used as a SQL identifier.
    InvalidIdentifier(String),
    /// Update key that is not a mapped column of the target table.
    UnknownColumn {
        table: &'static str,
        column: String,
    },
    /// Page numbers are 1-based and page size must be positive.
    InvalidPagination { page: u32, per_page: u32 },
    /// Requested page lies past the last page of results.
    PageOutOfRange { page: u32, num_pages: u64 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid sql identifier `{name}`"),
            Self::UnknownColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::InvalidPagination { page, per_page } => write!(
                f,
                "invalid pagination page={page} per_page={per_page}; both must be >= 1"
            ),
            Self::PageOutOfRange { page, num_pages } => {
                write!(f, "page {page} is out of range; result has {num_pages} page(s)")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
