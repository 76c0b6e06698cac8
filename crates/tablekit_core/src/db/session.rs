//! Unit of work over one SQLite connection.
//!
//! # Responsibility
//! - Stage record inserts/deletes until the next flush or commit.
//! - Open transactions lazily and end them through `commit`/`rollback`.
//! - Funnel every statement through one place so execution is observable.
//!
//! # Invariants
//! - Staged operations are applied in the order they were staged.
//! - Query execution flushes staged operations first (autoflush).
//! - `commit` never rolls back on its own; the caller owns that pairing.
//! - A session is single-threaded (`!Sync`); share it by reference only.

use super::{DbError, DbResult};
use crate::model::Table;
use crate::query::expr::{quote_identifier, SqlWriter};
use log::{debug, error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::cell::{Cell, RefCell};
use std::time::Instant;

#[derive(Debug)]
enum PendingOp {
    Insert {
        table: &'static str,
        values: Vec<(&'static str, Value)>,
    },
    Delete {
        table: &'static str,
        primary_key: &'static str,
        key: Value,
    },
}

impl PendingOp {
    fn to_sql(&self) -> DbResult<(String, Vec<Value>)> {
        let mut out = SqlWriter::default();
        match self {
            Self::Insert { table, values } => {
                out.push("INSERT INTO ");
                out.push_identifier(table)?;
                if values.is_empty() {
                    out.push(" DEFAULT VALUES");
                    return Ok(out.into_parts());
                }
                let columns = values
                    .iter()
                    .map(|(column, _)| quote_identifier(column))
                    .collect::<DbResult<Vec<_>>>()?;
                out.push(" (");
                out.push(&columns.join(", "));
                out.push(") VALUES (");
                for (index, (_, value)) in values.iter().enumerate() {
                    if index > 0 {
                        out.push(", ");
                    }
                    out.push_param(value.clone());
                }
                out.push(")");
            }
            Self::Delete {
                table,
                primary_key,
                key,
            } => {
                out.push("DELETE FROM ");
                out.push_identifier(table)?;
                out.push(" WHERE ");
                out.push_identifier(primary_key)?;
                out.push(" = ");
                out.push_param(key.clone());
            }
        }
        Ok(out.into_parts())
    }
}

/// Database session shared by every table service bound to it.
pub struct Session {
    conn: Connection,
    pending: RefCell<Vec<PendingOp>>,
    executed: Cell<u64>,
}

impl Session {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            pending: RefCell::new(Vec::new()),
            executed: Cell::new(0),
        }
    }

    /// Raw connection, e.g. for schema setup. Statements run here bypass
    /// staging and are not counted.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Releases the connection, discarding staged operations.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Stages `record` for insertion.
    pub fn add<T: Table>(&self, record: &T) {
        self.pending.borrow_mut().push(PendingOp::Insert {
            table: T::NAME,
            values: record.insert_values(),
        });
    }

    /// Stages `record` for deletion by primary key.
    pub fn delete<T: Table>(&self, record: &T) {
        self.pending.borrow_mut().push(PendingOp::Delete {
            table: T::NAME,
            primary_key: T::PRIMARY_KEY,
            key: record.primary_key_value(),
        });
    }

    /// Number of staged, not yet flushed operations.
    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Statements executed through this session so far.
    pub fn executed_statements(&self) -> u64 {
        self.executed.get()
    }

    /// Writes staged operations inside the active (or a new) transaction.
    ///
    /// A failed flush leaves the transaction open; call `rollback`.
    pub fn flush(&self) -> DbResult<()> {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        if pending.is_empty() {
            return Ok(());
        }

        self.begin_if_needed()?;
        for op in &pending {
            let (sql, params) = op.to_sql()?;
            self.execute(&sql, &params)?;
        }
        debug!(
            "event=session_flush module=session status=ok ops={}",
            pending.len()
        );
        Ok(())
    }

    /// Flushes staged operations and commits the active transaction.
    pub fn commit(&self) -> DbResult<()> {
        let started_at = Instant::now();
        let result = self.flush().and_then(|()| {
            if self.in_transaction() {
                self.run_batch("COMMIT;")?;
            }
            Ok(())
        });

        match &result {
            Ok(()) => info!(
                "event=session_commit module=session status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=session_commit module=session status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Discards staged operations and rolls back the active transaction.
    pub fn rollback(&self) -> DbResult<()> {
        let discarded = std::mem::take(&mut *self.pending.borrow_mut()).len();
        let active = self.in_transaction();
        if active {
            self.run_batch("ROLLBACK;")?;
        }
        warn!(
            "event=session_rollback module=session status=ok discarded_ops={} had_transaction={}",
            discarded, active
        );
        Ok(())
    }

    /// Executes a write statement inside the active (or a new) transaction.
    pub(crate) fn execute_in_transaction(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        self.flush()?;
        self.begin_if_needed()?;
        self.execute(sql, params)
    }

    /// Runs a read statement after autoflush, mapping each row with `map`.
    ///
    /// `map` receives the row and the result column names.
    pub(crate) fn query_rows<R>(
        &self,
        sql: &str,
        params: &[Value],
        mut map: impl FnMut(&Row<'_>, &[String]) -> DbResult<R>,
    ) -> DbResult<Vec<R>> {
        self.flush()?;
        debug!("event=session_query module=session sql={sql}");
        self.bump();

        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut mapped = Vec::new();
        while let Some(row) = rows.next()? {
            mapped.push(map(row, &columns)?);
        }
        Ok(mapped)
    }

    /// Runs a read statement returning a single integer.
    pub(crate) fn query_scalar(&self, sql: &str, params: &[Value]) -> DbResult<i64> {
        let values = self.query_rows(sql, params, |row, _| Ok(row.get::<_, i64>(0)?))?;
        values
            .into_iter()
            .next()
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        debug!("event=session_execute module=session sql={sql}");
        self.bump();
        let changed = self.conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(changed)
    }

    fn begin_if_needed(&self) -> DbResult<()> {
        if !self.in_transaction() {
            self.run_batch("BEGIN DEFERRED;")?;
        }
        Ok(())
    }

    fn run_batch(&self, sql: &str) -> DbResult<()> {
        self.bump();
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn bump(&self) {
        self.executed.set(self.executed.get() + 1);
    }
}
