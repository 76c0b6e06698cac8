//! Composable query over one mapped table.
//!
//! # Responsibility
//! - Accumulate filters, projection, grouping and ordering without I/O.
//! - Execute through the owning `Session` on terminal calls only.
//!
//! # Invariants
//! - Repeated `filter` calls are AND-ed in call order.
//! - `with_entities` replaces the projection; an empty one selects all
//!   mapped columns and decodes rows through `Table::from_row`.
//! - `update` ignores projection, grouping and ordering.

use super::expr::{Column, Expr, OrderBy, SqlWriter};
use super::page::{page_count, page_offset, Page};
use crate::db::{DbError, DbResult, Session};
use crate::model::{Projection, Record, Table};
use rusqlite::types::Value;
use std::marker::PhantomData;

pub struct Query<'s, T: Table> {
    session: &'s Session,
    filters: Vec<Expr>,
    entities: Vec<Column>,
    group_by: Vec<Column>,
    order_by: Vec<OrderBy>,
    _table: PhantomData<fn() -> T>,
}

impl<'s, T: Table> Query<'s, T> {
    /// Starts an unfiltered query over `T`'s table.
    pub fn new(session: &'s Session) -> Self {
        Self {
            session,
            filters: Vec::new(),
            entities: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            _table: PhantomData,
        }
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn with_entities(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.entities = columns.into_iter().collect();
        self
    }

    pub fn group_by(mut self, column: Column) -> Self {
        self.group_by.push(column);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Renders the SELECT statement and its parameters without executing.
    pub fn to_sql(&self) -> DbResult<(String, Vec<Value>)> {
        let mut out = SqlWriter::default();
        self.render_select(&mut out, None)?;
        Ok(out.into_parts())
    }

    /// Returns the first matching record, if any.
    pub fn first(&self) -> DbResult<Option<Record<T>>> {
        let mut records = self.fetch(Some((1, 0)))?;
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(records.swap_remove(0)))
    }

    /// Returns every matching record.
    pub fn all(&self) -> DbResult<Vec<Record<T>>> {
        self.fetch(None)
    }

    /// Counts result rows (groups, when grouped).
    pub fn count(&self) -> DbResult<u64> {
        let mut out = SqlWriter::default();
        out.push("SELECT COUNT(*) FROM (");
        self.render_select(&mut out, None)?;
        out.push(")");
        let (sql, params) = out.into_parts();
        let count = self.session.query_scalar(&sql, &params)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Bulk-updates every row matching the filters; returns affected rows.
    ///
    /// Runs inside the session transaction and is not committed here.
    pub fn update(&self, changes: &[(&str, Value)]) -> DbResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        for (column, _) in changes {
            if !T::COLUMNS.contains(column) {
                return Err(DbError::UnknownColumn {
                    table: T::NAME,
                    column: (*column).to_string(),
                });
            }
        }

        let mut out = SqlWriter::default();
        out.push("UPDATE ");
        out.push_identifier(T::NAME)?;
        out.push(" SET ");
        for (index, (column, value)) in changes.iter().enumerate() {
            if index > 0 {
                out.push(", ");
            }
            out.push_identifier(column)?;
            out.push(" = ");
            out.push_param(value.clone());
        }
        self.render_where(&mut out)?;

        let (sql, params) = out.into_parts();
        self.session.execute_in_transaction(&sql, &params)
    }

    /// Returns 1-based `page` of `per_page` records.
    ///
    /// Fails with `PageOutOfRange` when a page other than the first is empty.
    pub fn paginate(&self, per_page: u32, page: u32) -> DbResult<Page<Record<T>>> {
        if page == 0 || per_page == 0 {
            return Err(DbError::InvalidPagination { page, per_page });
        }

        let total = self.count()?;
        let num_pages = page_count(total, per_page);
        let items = self.fetch(Some((u64::from(per_page), page_offset(page, per_page))))?;
        if items.is_empty() && page != 1 {
            return Err(DbError::PageOutOfRange { page, num_pages });
        }

        Ok(Page {
            items,
            num_pages,
            page,
            per_page,
            total,
        })
    }

    fn fetch(&self, limit: Option<(u64, u64)>) -> DbResult<Vec<Record<T>>> {
        let mut out = SqlWriter::default();
        self.render_select(&mut out, limit)?;
        let (sql, params) = out.into_parts();
        let projected = !self.entities.is_empty();

        self.session.query_rows(&sql, &params, |row, columns| {
            if projected {
                Ok(Record::Projection(Projection::from_row(row, columns)?))
            } else {
                Ok(Record::Model(T::from_row(row)?))
            }
        })
    }

    fn render_select(&self, out: &mut SqlWriter, limit: Option<(u64, u64)>) -> DbResult<()> {
        out.push("SELECT ");
        if self.entities.is_empty() {
            out.push_identifier(T::NAME)?;
            out.push(".*");
        } else {
            for (index, column) in self.entities.iter().enumerate() {
                if index > 0 {
                    out.push(", ");
                }
                out.push_column(column)?;
            }
        }
        out.push(" FROM ");
        out.push_identifier(T::NAME)?;
        self.render_where(out)?;

        if !self.group_by.is_empty() {
            out.push(" GROUP BY ");
            for (index, column) in self.group_by.iter().enumerate() {
                if index > 0 {
                    out.push(", ");
                }
                out.push_column(column)?;
            }
        }

        if !self.order_by.is_empty() {
            out.push(" ORDER BY ");
            for (index, order) in self.order_by.iter().enumerate() {
                if index > 0 {
                    out.push(", ");
                }
                order.render(out)?;
            }
        }

        if let Some((limit, offset)) = limit {
            out.push(" LIMIT ");
            out.push_param(Value::Integer(clamp_i64(limit)));
            out.push(" OFFSET ");
            out.push_param(Value::Integer(clamp_i64(offset)));
        }
        Ok(())
    }

    fn render_where(&self, out: &mut SqlWriter) -> DbResult<()> {
        if self.filters.is_empty() {
            return Ok(());
        }
        out.push(" WHERE ");
        for (index, predicate) in self.filters.iter().enumerate() {
            if index > 0 {
                out.push(" AND ");
            }
            predicate.render(out)?;
        }
        Ok(())
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
