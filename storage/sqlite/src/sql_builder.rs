//! SQL builder for SQLite statements
//!
//! Translates table names, column names and [`KeyValue`] filters/assignments into SQL text plus the
//! ordered parameters to bind. Nothing here touches a database.
//!
//! Identifiers are always double-quoted (embedded quotes doubled) and every present value is bound as
//! a `?` parameter rather than spliced into the text. Absent values render as the `NULL` keyword:
//! `IS NULL` in filters, `= NULL` in assignments and a bare `NULL` in insert value lists.

use thiserror::Error;

use crate::error::SqliteError;
use crate::value::KeyValue;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqlGenerationError {
    #[error("No columns given for insert into {0}")]
    NoColumns(String),
    #[error("No assignments given for update of {0}")]
    NoAssignments(String),
}

impl From<SqlGenerationError> for SqliteError {
    fn from(err: SqlGenerationError) -> Self { SqliteError::SqlGeneration(err.to_string()) }
}

/// A complete statement: SQL text and the parameters for its `?` placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<rusqlite::types::Value>,
}

/// Column selected by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column<'a> {
    /// `*`
    All,
    Named(&'a str),
}

impl<'a> From<&'a str> for Column<'a> {
    fn from(name: &'a str) -> Self {
        match name {
            "*" => Column::All,
            name => Column::Named(name),
        }
    }
}

/// Aggregate functions available through [`aggregate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
}

impl Aggregate {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
        }
    }
}

/// Quote an identifier for use in SQL text
pub fn quote_identifier(name: &str) -> String { format!(r#""{}""#, name.replace('"', "\"\"")) }

/// `SELECT <column> FROM <table>[ WHERE <filters>];`
pub fn select(table: &str, column: Column<'_>, filters: &[KeyValue]) -> Statement {
    let mut sql = SqlBuilder::new();
    sql.push_sql("SELECT ");
    sql.column(column);
    sql.push_sql(" FROM ");
    sql.identifier(table);
    sql.filters(filters);
    sql.build()
}

/// `INSERT[ OR REPLACE] INTO <table>(<columns>) VALUES (<values>);`
pub fn insert(table: &str, key_values: &[KeyValue], replace: bool) -> Result<Statement, SqlGenerationError> {
    if key_values.is_empty() {
        return Err(SqlGenerationError::NoColumns(table.to_owned()));
    }

    let mut sql = SqlBuilder::new();
    sql.insert_into(table, replace);
    sql.push_sql("(");
    for (i, kv) in key_values.iter().enumerate() {
        if i > 0 {
            sql.push_sql(", ");
        }
        sql.identifier(kv.key());
    }
    sql.push_sql(") VALUES (");
    for (i, kv) in key_values.iter().enumerate() {
        if i > 0 {
            sql.push_sql(", ");
        }
        match kv.value() {
            Some(value) => sql.push_param(value),
            None => sql.push_sql("NULL"),
        }
    }
    sql.push_sql(")");
    Ok(sql.build())
}

/// `INSERT[ OR REPLACE] INTO <table> VALUES (?, ?, …);`
///
/// Purely positional: the values bound per row must follow the table's physical column order.
pub fn insert_placeholders(table: &str, column_count: usize, replace: bool) -> Result<Statement, SqlGenerationError> {
    if column_count == 0 {
        return Err(SqlGenerationError::NoColumns(table.to_owned()));
    }

    let mut sql = SqlBuilder::new();
    sql.insert_into(table, replace);
    sql.push_sql(" VALUES (");
    sql.push_sql(&vec!["?"; column_count].join(", "));
    sql.push_sql(")");
    Ok(sql.build())
}

/// `UPDATE <table> SET <assignments>[ WHERE <filters>];`
///
/// Empty `filters` updates every row of the table.
pub fn update(table: &str, assignments: &[KeyValue], filters: &[KeyValue]) -> Result<Statement, SqlGenerationError> {
    if assignments.is_empty() {
        return Err(SqlGenerationError::NoAssignments(table.to_owned()));
    }

    let mut sql = SqlBuilder::new();
    sql.push_sql("UPDATE ");
    sql.identifier(table);
    sql.push_sql(" SET ");
    for (i, kv) in assignments.iter().enumerate() {
        if i > 0 {
            sql.push_sql(", ");
        }
        sql.assignment(kv);
    }
    sql.filters(filters);
    Ok(sql.build())
}

/// `DELETE FROM <table>[ WHERE <filters>];`
///
/// Empty `filters` deletes every row of the table.
pub fn delete(table: &str, filters: &[KeyValue]) -> Statement {
    let mut sql = SqlBuilder::new();
    sql.push_sql("DELETE FROM ");
    sql.identifier(table);
    sql.filters(filters);
    sql.build()
}

/// `SELECT <FUNCTION>(<column>) FROM <table>[ WHERE <filters>];`
pub fn aggregate(function: Aggregate, table: &str, column: Column<'_>, filters: &[KeyValue]) -> Statement {
    let mut sql = SqlBuilder::new();
    sql.push_sql("SELECT ");
    sql.push_sql(function.as_sql());
    sql.push_sql("(");
    sql.column(column);
    sql.push_sql(") FROM ");
    sql.identifier(table);
    sql.filters(filters);
    sql.build()
}

struct SqlBuilder {
    sql: String,
    params: Vec<rusqlite::types::Value>,
}

impl SqlBuilder {
    fn new() -> Self { Self { sql: String::new(), params: Vec::new() } }

    fn push_sql(&mut self, s: &str) { self.sql.push_str(s); }

    fn push_param(&mut self, value: &str) {
        self.sql.push('?');
        self.params.push(rusqlite::types::Value::Text(value.to_owned()));
    }

    fn identifier(&mut self, name: &str) { self.sql.push_str(&quote_identifier(name)); }

    fn column(&mut self, column: Column<'_>) {
        match column {
            Column::All => self.push_sql("*"),
            Column::Named(name) => self.identifier(name),
        }
    }

    fn insert_into(&mut self, table: &str, replace: bool) {
        self.push_sql(if replace { "INSERT OR REPLACE INTO " } else { "INSERT INTO " });
        self.identifier(table);
    }

    fn filters(&mut self, filters: &[KeyValue]) {
        for (i, kv) in filters.iter().enumerate() {
            self.push_sql(if i == 0 { " WHERE " } else { " AND " });
            self.filter(kv);
        }
    }

    fn filter(&mut self, kv: &KeyValue) {
        self.identifier(kv.key());
        match kv.value() {
            Some(value) => {
                self.push_sql(" = ");
                self.push_param(value);
            }
            None => self.push_sql(" IS NULL"),
        }
    }

    fn assignment(&mut self, kv: &KeyValue) {
        self.identifier(kv.key());
        self.push_sql(" = ");
        match kv.value() {
            Some(value) => self.push_param(value),
            None => self.push_sql("NULL"),
        }
    }

    fn build(mut self) -> Statement {
        self.sql.push(';');
        Statement { sql: self.sql, params: self.params }
    }
}
