//! Query construction and execution over mapped tables.
//!
//! # Responsibility
//! - Provide the expression builder used for row filters and ordering.
//! - Provide a composable `Query` that renders SQL without executing it.
//!
//! # Invariants
//! - Building a query never touches the store; only terminal calls
//!   (`first`, `all`, `count`, `update`, `paginate`) execute statements.

pub mod builder;
pub mod expr;
pub mod page;
