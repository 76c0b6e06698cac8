//! Generic table access over SQLite.
//! `TableService` offers filtered read, count, existence, create, update and
//! delete for any type implementing `Table`, reporting through `QueryStatus`.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod service;

pub use config::{DbConfig, ServiceConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult, Session};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig};
pub use model::{Projection, Record, Table};
pub use query::builder::Query;
pub use query::expr::{Column, CompareOp, Expr, OrderBy};
pub use query::page::Page;
pub use service::status::{Operation, QueryStatus, ServiceError, ServiceResult};
pub use service::table_service::{Fetch, QuerySpec, ReadData, TableService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
