//! Expression builder for row filters, projections and ordering.
//!
//! # Responsibility
//! - Model predicates as an opaque tree the service passes through untouched.
//! - Render expressions to SQLite SQL with positional `?` parameters.
//!
//! # Invariants
//! - Literal values are always bound, never spliced into SQL text.
//! - Identifiers must match `[A-Za-z_][A-Za-z0-9_]*` and are double-quoted.

use crate::db::{DbError, DbResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Returns `name` double-quoted, or `InvalidIdentifier` when it is not a
/// plain SQL identifier.
pub(crate) fn quote_identifier(name: &str) -> DbResult<String> {
    if !IDENTIFIER_RE.is_match(name) {
        return Err(DbError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

/// SQL text under construction plus its bound parameters.
#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

impl SqlWriter {
    pub(crate) fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    pub(crate) fn push_param(&mut self, value: Value) {
        self.sql.push('?');
        self.params.push(value);
    }

    pub(crate) fn push_identifier(&mut self, name: &str) -> DbResult<()> {
        let quoted = quote_identifier(name)?;
        self.sql.push_str(&quoted);
        Ok(())
    }

    pub(crate) fn push_column(&mut self, column: &Column) -> DbResult<()> {
        if let Some(table) = column.table() {
            self.push_identifier(table)?;
            self.sql.push('.');
        }
        self.push_identifier(column.name())
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

/// Reference to a column, optionally qualified by its table.
#[derive(Debug, Clone)]
pub struct Column {
    table: Option<String>,
    name: String,
}

impl Column {
    pub fn new(table: &str, name: &str) -> Self {
        Self {
            table: Some(table.to_string()),
            name: name.to_string(),
        }
    }

    /// Column reference without table qualification, e.g. a result alias.
    pub fn unqualified(name: &str) -> Self {
        Self {
            table: None,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// `column = value`; a `Null` value renders as `IS NULL`.
    pub fn eq(&self, value: impl Into<Value>) -> Expr {
        match value.into() {
            Value::Null => self.is_null(),
            value => self.compare(CompareOp::Eq, value),
        }
    }

    /// `column <> value`; a `Null` value renders as `IS NOT NULL`.
    pub fn ne(&self, value: impl Into<Value>) -> Expr {
        match value.into() {
            Value::Null => self.is_not_null(),
            value => self.compare(CompareOp::Ne, value),
        }
    }

    pub fn lt(&self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Lt, value.into())
    }

    pub fn le(&self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Le, value.into())
    }

    pub fn gt(&self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Gt, value.into())
    }

    pub fn ge(&self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Ge, value.into())
    }

    /// `column = other_column`.
    pub fn eq_column(&self, other: &Column) -> Expr {
        Expr::Compare {
            op: CompareOp::Eq,
            lhs: Box::new(Expr::Column(self.clone())),
            rhs: Box::new(Expr::Column(other.clone())),
        }
    }

    pub fn like(&self, pattern: impl Into<String>) -> Expr {
        Expr::Like {
            expr: Box::new(Expr::Column(self.clone())),
            pattern: pattern.into(),
            negated: false,
        }
    }

    pub fn not_like(&self, pattern: impl Into<String>) -> Expr {
        Expr::Like {
            expr: Box::new(Expr::Column(self.clone())),
            pattern: pattern.into(),
            negated: true,
        }
    }

    pub fn is_null(&self) -> Expr {
        Expr::IsNull {
            expr: Box::new(Expr::Column(self.clone())),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Expr {
        Expr::IsNull {
            expr: Box::new(Expr::Column(self.clone())),
            negated: true,
        }
    }

    pub fn is_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Expr {
        Expr::InList {
            expr: Box::new(Expr::Column(self.clone())),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Expr {
        Expr::InList {
            expr: Box::new(Expr::Column(self.clone())),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    /// Ascending order on this column.
    pub fn asc(&self) -> OrderBy {
        OrderBy::asc(self.clone())
    }

    /// Descending order on this column.
    pub fn desc(&self) -> OrderBy {
        OrderBy::desc(self.clone())
    }

    fn compare(&self, op: CompareOp, value: Value) -> Expr {
        Expr::Compare {
            op,
            lhs: Box::new(Expr::Column(self.clone())),
            rhs: Box::new(Expr::Value(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Boolean or scalar expression understood by the query engine.
#[derive(Debug, Clone)]
pub enum Expr {
    Column(Column),
    Value(Value),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Like {
        expr: Box<Expr>,
        pattern: String,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        values: Vec<Value>,
        negated: bool,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn and(self, other: Expr) -> Expr {
        match self {
            Expr::And(mut terms) => {
                terms.push(other);
                Expr::And(terms)
            }
            first => Expr::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Expr) -> Expr {
        match self {
            Expr::Or(mut terms) => {
                terms.push(other);
                Expr::Or(terms)
            }
            first => Expr::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    /// Conjunction of all terms; an empty set is always true.
    pub fn all(terms: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(terms.into_iter().collect())
    }

    /// Disjunction of all terms; an empty set is always false.
    pub fn any(terms: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(terms.into_iter().collect())
    }

    pub(crate) fn render(&self, out: &mut SqlWriter) -> DbResult<()> {
        match self {
            Expr::Column(column) => out.push_column(column)?,
            Expr::Value(value) => out.push_param(value.clone()),
            Expr::Compare { op, lhs, rhs } => {
                out.push("(");
                lhs.render(out)?;
                out.push(" ");
                out.push(op.as_sql());
                out.push(" ");
                rhs.render(out)?;
                out.push(")");
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                out.push("(");
                expr.render(out)?;
                out.push(if *negated { " NOT LIKE " } else { " LIKE " });
                out.push_param(Value::Text(pattern.clone()));
                out.push(")");
            }
            Expr::IsNull { expr, negated } => {
                out.push("(");
                expr.render(out)?;
                out.push(if *negated { " IS NOT NULL)" } else { " IS NULL)" });
            }
            Expr::InList {
                expr,
                values,
                negated,
            } => {
                if values.is_empty() {
                    out.push(if *negated { "(1 = 1)" } else { "(1 = 0)" });
                    return Ok(());
                }
                out.push("(");
                expr.render(out)?;
                out.push(if *negated { " NOT IN (" } else { " IN (" });
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        out.push(", ");
                    }
                    out.push_param(value.clone());
                }
                out.push("))");
            }
            Expr::And(terms) => render_joined(out, terms, " AND ", "(1 = 1)")?,
            Expr::Or(terms) => render_joined(out, terms, " OR ", "(1 = 0)")?,
            Expr::Not(inner) => {
                out.push("(NOT ");
                inner.render(out)?;
                out.push(")");
            }
        }
        Ok(())
    }
}

impl From<Column> for Expr {
    fn from(value: Column) -> Self {
        Expr::Column(value)
    }
}

fn render_joined(out: &mut SqlWriter, terms: &[Expr], separator: &str, empty: &str) -> DbResult<()> {
    if terms.is_empty() {
        out.push(empty);
        return Ok(());
    }
    out.push("(");
    for (index, term) in terms.iter().enumerate() {
        if index > 0 {
            out.push(separator);
        }
        term.render(out)?;
    }
    out.push(")");
    Ok(())
}

/// Ordering on a single column.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: Column,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: Column) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    pub fn desc(column: Column) -> Self {
        Self {
            column,
            ascending: false,
        }
    }

    pub(crate) fn render(&self, out: &mut SqlWriter) -> DbResult<()> {
        out.push_column(&self.column)?;
        out.push(if self.ascending { " ASC" } else { " DESC" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{quote_identifier, Column, Expr, SqlWriter};
    use crate::db::DbError;
    use rusqlite::types::Value;

    fn render(expr: &Expr) -> (String, Vec<Value>) {
        let mut out = SqlWriter::default();
        expr.render(&mut out).expect("expression should render");
        out.into_parts()
    }

    #[test]
    fn comparison_binds_value_and_qualifies_column() {
        let (sql, params) = render(&Column::new("users", "age").ge(18));
        assert_eq!(sql, r#"("users"."age" >= ?)"#);
        assert_eq!(params, vec![Value::Integer(18)]);
    }

    #[test]
    fn null_equality_renders_is_null() {
        let (sql, params) = render(&Column::unqualified("email").eq(Value::Null));
        assert_eq!(sql, r#"("email" IS NULL)"#);
        assert!(params.is_empty());
    }

    #[test]
    fn conjunction_flattens_and_keeps_param_order() {
        let name = Column::new("users", "name");
        let age = Column::new("users", "age");
        let expr = name
            .like("a%")
            .and(age.lt(30))
            .and(age.is_in([1, 2]).not());
        let (sql, params) = render(&expr);
        assert_eq!(
            sql,
            r#"(("users"."name" LIKE ?) AND ("users"."age" < ?) AND (NOT ("users"."age" IN (?, ?))))"#
        );
        assert_eq!(
            params,
            vec![
                Value::Text("a%".to_string()),
                Value::Integer(30),
                Value::Integer(1),
                Value::Integer(2)
            ]
        );
    }

    #[test]
    fn empty_sets_render_constant_predicates() {
        let column = Column::unqualified("id");
        assert_eq!(render(&column.is_in(Vec::<i64>::new())).0, "(1 = 0)");
        assert_eq!(render(&column.not_in(Vec::<i64>::new())).0, "(1 = 1)");
        assert_eq!(render(&Expr::all(Vec::new())).0, "(1 = 1)");
        assert_eq!(render(&Expr::any(Vec::new())).0, "(1 = 0)");
    }

    #[test]
    fn disjunction_and_upper_bound_render() {
        let age = Column::new("users", "age");
        let name = Column::new("users", "name");
        let (sql, params) = render(&age.le(25).or(name.eq("cy".to_string())));
        assert_eq!(sql, r#"(("users"."age" <= ?) OR ("users"."name" = ?))"#);
        assert_eq!(params, vec![Value::Integer(25), Value::Text("cy".to_string())]);
    }

    #[test]
    fn negated_like_binds_pattern() {
        let (sql, params) = render(&Column::unqualified("name").not_like("a%"));
        assert_eq!(sql, r#"("name" NOT LIKE ?)"#);
        assert_eq!(params, vec![Value::Text("a%".to_string())]);
    }

    #[test]
    fn null_inequality_renders_is_not_null() {
        let (sql, params) = render(&Column::unqualified("team").ne(Value::Null));
        assert_eq!(sql, r#"("team" IS NOT NULL)"#);
        assert!(params.is_empty());
    }

    #[test]
    fn column_to_column_comparison_binds_nothing() {
        let expr = Column::new("users", "id").eq_column(&Column::new("teams", "owner_id"));
        let (sql, params) = render(&expr);
        assert_eq!(sql, r#"("users"."id" = "teams"."owner_id")"#);
        assert!(params.is_empty());
    }

    #[test]
    fn hostile_identifiers_are_rejected() {
        let err = quote_identifier("name\"; DROP TABLE users; --").unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier(_)));

        let mut out = SqlWriter::default();
        let result = Column::unqualified("1abc").eq(1).render(&mut out);
        assert!(matches!(result, Err(DbError::InvalidIdentifier(name)) if name == "1abc"));
    }
}
