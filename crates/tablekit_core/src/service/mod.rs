//! Table-level use-case services.
//!
//! # Responsibility
//! - Translate named read/write parameters into queries on a bound table.
//! - Report every outcome through the `QueryStatus` envelope.
//!
//! # Invariants
//! - Each mutating call ends in exactly one commit or one rollback.
//! - Service calls keep no query state between invocations.

pub mod status;
pub mod table_service;
