//! Generic CRUD service bound to one mapped table.
//!
//! # Responsibility
//! - Build queries from per-call parameters (`QuerySpec`, `Fetch`).
//! - Run reads, counts and existence checks against the bound table.
//! - Stage writes on the shared session and commit once per call.
//!
//! # Invariants
//! - `query` is pure; it never executes statements.
//! - A failed commit is rolled back and the original error is returned.
//! - Any failure before commit also rolls back, so the session never keeps
//!   a half-applied transaction from this service. This includes writes the
//!   caller staged earlier and that were autoflushed by the lookup.
//! - `delete` of an unknown id fails with `ServiceError::NotFound`.

use super::status::{Operation, QueryStatus, ServiceError, ServiceResult};
use crate::config::ServiceConfig;
use crate::db::{DbResult, Session};
use crate::model::{Record, Table};
use crate::query::builder::Query;
use crate::query::expr::{Column, Expr, OrderBy};
use crate::query::page::Page;
use log::{debug, error, info, warn};
use rusqlite::types::Value;
use std::marker::PhantomData;
use std::time::Instant;

/// Per-call query parameters. `QuerySpec::default()` selects every row and
/// column in storage order.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub row_filter: Option<Expr>,
    /// Empty means all mapped columns.
    pub column_filter: Vec<Column>,
    pub group_by: Option<Column>,
    pub order_by: Option<OrderBy>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, row_filter: Expr) -> Self {
        self.row_filter = Some(row_filter);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.column_filter = columns.into_iter().collect();
        self
    }

    pub fn group_by(mut self, column: Column) -> Self {
        self.group_by = Some(column);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }
}

/// How `read` materializes results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fetch {
    /// First matching record or none.
    #[default]
    First,
    /// Every matching record.
    All,
    /// 1-based page sized by the service page size.
    Page(u32),
}

/// Payload of a successful `read`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadData<R> {
    First(Option<R>),
    All(Vec<R>),
    Page(Page<R>),
}

impl<R> ReadData<R> {
    pub fn into_first(self) -> Option<R> {
        match self {
            Self::First(record) => record,
            Self::All(records) => records.into_iter().next(),
            Self::Page(page) => page.items.into_iter().next(),
        }
    }

    pub fn into_all(self) -> Vec<R> {
        match self {
            Self::First(record) => record.into_iter().collect(),
            Self::All(records) => records,
            Self::Page(page) => page.items,
        }
    }

    pub fn into_page(self) -> Option<Page<R>> {
        match self {
            Self::Page(page) => Some(page),
            _ => None,
        }
    }
}

/// CRUD accessor for table `T` on a shared session.
pub struct TableService<'s, T: Table> {
    session: &'s Session,
    per_page: u32,
    _table: PhantomData<fn() -> T>,
}

impl<'s, T: Table> TableService<'s, T> {
    /// Creates a service with the default page size.
    pub fn new(session: &'s Session) -> Self {
        Self::with_config(session, ServiceConfig::default())
    }

    pub fn with_config(session: &'s Session, config: ServiceConfig) -> Self {
        Self {
            session,
            per_page: config.effective_per_page(),
            _table: PhantomData,
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    /// Builds, but does not run, a query from `spec`.
    ///
    /// Clauses apply in fixed order: filter, projection, grouping, ordering.
    pub fn query(&self, spec: &QuerySpec) -> Query<'s, T> {
        let mut query = Query::new(self.session);

        if let Some(row_filter) = &spec.row_filter {
            query = query.filter(row_filter.clone());
        }

        if !spec.column_filter.is_empty() {
            query = query.with_entities(spec.column_filter.iter().cloned());
        }

        if let Some(group_by) = &spec.group_by {
            query = query.group_by(group_by.clone());
        }

        if let Some(order_by) = &spec.order_by {
            query = query.order_by(order_by.clone());
        }

        query
    }

    /// Runs `spec` and materializes results according to `fetch`.
    pub fn read(&self, spec: &QuerySpec, fetch: Fetch) -> QueryStatus<ReadData<Record<T>>> {
        let started_at = Instant::now();
        let query = self.query(spec);
        let outcome = match fetch {
            Fetch::First => query.first().map(ReadData::First),
            Fetch::All => query.all().map(ReadData::All),
            Fetch::Page(page) => query.paginate(self.per_page, page).map(ReadData::Page),
        };
        self.finish(Operation::Read, started_at, outcome.map_err(Into::into))
    }

    /// Counts rows matching `row_filter`.
    pub fn count(&self, row_filter: Option<&Expr>, column_filter: &[Column]) -> QueryStatus<u64> {
        let started_at = Instant::now();
        let spec = QuerySpec {
            row_filter: row_filter.cloned(),
            column_filter: column_filter.to_vec(),
            ..QuerySpec::default()
        };
        let outcome = self.query(&spec).count().map_err(Into::into);
        self.finish(Operation::Count, started_at, outcome)
    }

    /// Returns whether at least one row matches `row_filter`.
    pub fn is_available(&self, row_filter: &Expr) -> QueryStatus<bool> {
        let started_at = Instant::now();
        let outcome = self
            .count(Some(row_filter), &[])
            .into_result()
            .map(|count| count > 0);
        self.finish(Operation::IsAvailable, started_at, outcome)
    }

    /// Inserts `new_record` and commits.
    pub fn create(&self, new_record: &T) -> QueryStatus<()> {
        let started_at = Instant::now();
        let outcome = self.mutate(|| {
            self.session.add(new_record);
            Ok(())
        });
        self.finish(Operation::Create, started_at, outcome)
    }

    /// Applies `changes` to the row whose primary key equals `id` and commits.
    ///
    /// Updating an unknown id, or passing no changes, writes nothing and
    /// still succeeds.
    pub fn update(&self, id: impl Into<Value>, changes: &[(&str, Value)]) -> QueryStatus<()> {
        let started_at = Instant::now();
        let id = id.into();
        let outcome = self.mutate(|| {
            let spec = QuerySpec::new().filter(T::id().eq(id.clone()));
            if changes.is_empty() {
                debug!(
                    "event=table_update module=service status=skipped table={} reason=no_changes",
                    T::NAME
                );
                return Ok(());
            }
            let changed = self.query(&spec).update(changes)?;
            if changed == 0 {
                warn!(
                    "event=table_update module=service status=noop table={} id={}",
                    T::NAME,
                    describe_value(&id)
                );
            }
            Ok(())
        });
        self.finish(Operation::Update, started_at, outcome)
    }

    /// Deletes the row whose primary key equals `id` and commits.
    pub fn delete(&self, id: impl Into<Value>) -> QueryStatus<()> {
        let started_at = Instant::now();
        let id = id.into();
        let outcome = self.mutate(|| {
            let spec = QuerySpec::new().filter(T::id().eq(id.clone()));
            match self.read(&spec, Fetch::First).into_result()?.into_first() {
                Some(Record::Model(record)) => {
                    self.session.delete(&record);
                    Ok(())
                }
                _ => Err(ServiceError::NotFound {
                    table: T::NAME,
                    id: describe_value(&id),
                }),
            }
        });
        self.finish(Operation::Delete, started_at, outcome)
    }

    /// Commits the session; on failure rolls back and returns the original
    /// error.
    pub fn commit(&self) -> DbResult<()> {
        match self.session.commit() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.rollback_after(&err);
                Err(err)
            }
        }
    }

    fn mutate(&self, stage: impl FnOnce() -> ServiceResult<()>) -> ServiceResult<()> {
        match stage() {
            Ok(()) => Ok(self.commit()?),
            Err(err) => {
                self.rollback_after(&err);
                Err(err)
            }
        }
    }

    fn rollback_after(&self, cause: &dyn std::error::Error) {
        if let Err(rollback_err) = self.session.rollback() {
            error!(
                "event=table_rollback module=service status=error table={} cause={} error={}",
                T::NAME,
                cause,
                rollback_err
            );
        }
    }

    fn finish<D>(
        &self,
        operation: Operation,
        started_at: Instant,
        outcome: ServiceResult<D>,
    ) -> QueryStatus<D> {
        match &outcome {
            Ok(_) => info!(
                "event=table_{} module=service status=ok table={} duration_ms={}",
                operation,
                T::NAME,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=table_{} module=service status=error table={} duration_ms={} error={}",
                operation,
                T::NAME,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        QueryStatus::new(T::NAME, operation, outcome)
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => text.clone(),
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}
