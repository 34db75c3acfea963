//! Per-kind FMEA repositories
//!
//! A repository performs select/insert/update/delete against one program
//! database table. Rows are converted through the record's attribute map, so
//! the same code serves all five kinds; NULL columns, and values the record
//! cannot hold, are skipped on load and take the record's default value.

use std::marker::PhantomData;

use rusqlite::types::{Type, Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::core::record::{Attributes, Record};
use crate::entities::{Action, Cause, Control, Mechanism, Mode};

pub type ModeRepository = Repository<Mode>;
pub type MechanismRepository = Repository<Mechanism>;
pub type CauseRepository = Repository<Cause>;
pub type ControlRepository = Repository<Control>;
pub type ActionRepository = Repository<Action>;

/// Row access for one record kind
#[derive(Debug)]
pub struct Repository<R: Record> {
    last_id: i64,
    _record: PhantomData<R>,
}

impl<R: Record> Default for Repository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Repository<R> {
    pub fn new() -> Self {
        Self {
            last_id: 0,
            _record: PhantomData,
        }
    }

    /// Highest identity this repository has selected or allocated
    pub fn last_id(&self) -> i64 {
        self.last_id
    }

    /// Select every row whose `column` equals `parent_id`, ordered by identity
    ///
    /// `column` must be one of the record's parent-reference columns.
    pub fn select_all(
        &mut self,
        conn: &Connection,
        column: &str,
        parent_id: i64,
    ) -> Result<Vec<R>, RepositoryError> {
        if !R::PARENT_COLUMNS.contains(&column) {
            return Err(RepositoryError::Store(rusqlite::Error::InvalidColumnName(
                column.to_string(),
            )));
        }

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY {}",
            select_list::<R>(),
            R::TABLE,
            column,
            R::KEY
        );
        let mut stmt = conn.prepare(&sql).map_err(classify::<R>)?;
        let rows = stmt
            .query_map(params![parent_id], from_row::<R>)
            .map_err(classify::<R>)?
            .collect::<Result<Vec<R>, _>>()
            .map_err(classify::<R>)?;

        if let Some(max) = rows.iter().map(Record::id).max() {
            self.last_id = self.last_id.max(max);
        }
        Ok(rows)
    }

    /// Select one row by identity
    pub fn select(&self, conn: &Connection, id: i64) -> Result<Option<R>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            select_list::<R>(),
            R::TABLE,
            R::KEY
        );
        conn.query_row(&sql, params![id], from_row::<R>)
            .optional()
            .map_err(classify::<R>)
    }

    /// Insert a new row and return it with its freshly allocated identity
    pub fn insert(&mut self, conn: &Connection, mut record: R) -> Result<R, RepositoryError> {
        let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE,
            R::COLUMNS.join(", "),
            placeholders.join(", ")
        );
        conn.execute(&sql, params_from_iter(to_sql_values(&record)))
            .map_err(classify::<R>)?;

        let id = conn.last_insert_rowid();
        record.set_id(id);
        self.last_id = self.last_id.max(id);
        Ok(record)
    }

    /// Write a record back to its row
    pub fn update(&self, conn: &Connection, record: &R) -> Result<(), RepositoryError> {
        let assignments: Vec<String> = R::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            R::TABLE,
            assignments.join(", "),
            R::KEY,
            R::COLUMNS.len() + 1
        );

        let mut values = to_sql_values(record);
        values.push(SqlValue::Integer(record.id()));
        let changed = conn
            .execute(&sql, params_from_iter(values))
            .map_err(classify::<R>)?;

        if changed == 0 {
            return Err(RepositoryError::NotFound {
                table: R::TABLE,
                id: record.id(),
            });
        }
        Ok(())
    }

    /// Remove a row by identity
    pub fn delete(&self, conn: &Connection, id: i64) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1", R::TABLE, R::KEY);
        let changed = conn.execute(&sql, params![id]).map_err(classify::<R>)?;

        if changed == 0 {
            return Err(RepositoryError::NotFound { table: R::TABLE, id });
        }
        Ok(())
    }
}

fn select_list<R: Record>() -> String {
    std::iter::once(R::KEY)
        .chain(R::COLUMNS.iter().copied())
        .collect::<Vec<_>>()
        .join(", ")
}

fn from_row<R: Record>(row: &Row<'_>) -> rusqlite::Result<R> {
    let mut attributes = Attributes::new();
    for (i, name) in std::iter::once(R::KEY)
        .chain(R::COLUMNS.iter().copied())
        .enumerate()
    {
        let value = match row.get_ref(i)? {
            ValueRef::Null | ValueRef::Blob(_) => continue,
            ValueRef::Integer(n) => Value::from(n),
            ValueRef::Real(x) => Value::from(x),
            ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        };
        if let Err(e) = readable::<R>(name, &value) {
            warn!(
                table = R::TABLE,
                column = name,
                index = i,
                value = %value,
                error = %e,
                "Unreadable column value, using default"
            );
            continue;
        }
        attributes.insert(name.to_string(), value);
    }

    serde_json::from_value(Value::Object(attributes)).map_err(|e| {
        let key = row.get::<_, i64>(0).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Text,
            format!("{} row {}: {}", R::TABLE, key, e).into(),
        )
    })
}

/// Whether `value` alone deserializes into column `name` of `R`
fn readable<R: Record>(name: &str, value: &Value) -> Result<(), serde_json::Error> {
    let mut single = Attributes::new();
    single.insert(name.to_string(), value.clone());
    serde_json::from_value::<R>(Value::Object(single)).map(|_| ())
}

fn to_sql_values<R: Record>(record: &R) -> Vec<SqlValue> {
    let attributes = record.get_attributes();
    R::COLUMNS
        .iter()
        .map(|column| match attributes.get(*column) {
            Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
            },
            Some(Value::String(s)) => SqlValue::Text(s.clone()),
            Some(other @ (Value::Array(_) | Value::Object(_))) => SqlValue::Text(other.to_string()),
            Some(Value::Null) | None => SqlValue::Null,
        })
        .collect()
}

fn classify<R: Record>(err: rusqlite::Error) -> RepositoryError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            RepositoryError::Constraint {
                table: R::TABLE,
                source: err,
            }
        }
        _ => RepositoryError::Store(err),
    }
}

/// Errors from repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no row with id {id} in {table}")]
    NotFound { table: &'static str, id: i64 },

    #[error("{table} row rejected: {source}")]
    Constraint {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("program database error: {0}")]
    Store(#[source] rusqlite::Error),
}
