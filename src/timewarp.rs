//! Timewarp Records
//! Mission: Health probe and raw row dump for the `timewarp` table
//!
//! Rows are returned as JSON objects keyed by column name, whatever the
//! columns happen to be. Integers outside the range a JSON number can carry
//! exactly are rendered as strings, blobs as base64.

use crate::db::Database;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rusqlite::types::ValueRef;
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// Largest integer a JSON number (IEEE double) holds exactly.
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

pub const CONNECTION_ACTIVE: &str = "Database connection active";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: &'static str,
}

pub type TimewarpRecord = Map<String, Value>;

#[derive(Clone)]
pub struct TimewarpRepo {
    db: Database,
}

impl TimewarpRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn check_connection(&self) -> Result<HealthStatus> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare("SELECT id FROM timewarp LIMIT 1")
            .context("prepare health probe")?;
        let mut rows = stmt.query([]).context("run health probe")?;
        rows.next().context("read health probe")?;
        Ok(HealthStatus {
            status: CONNECTION_ACTIVE,
        })
    }

    pub fn all_records(&self) -> Result<Vec<TimewarpRecord>> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare("SELECT * FROM timewarp ORDER BY id")
            .context("prepare timewarp query")?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([]).context("query timewarp")?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().context("read timewarp row")? {
            let mut record = Map::with_capacity(columns.len());
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), to_json(row.get_ref(idx)?));
            }
            records.push(record);
        }
        Ok(records)
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if i.abs() > MAX_SAFE_INTEGER => Value::String(i.to_string()),
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(BASE64.encode(bytes)),
    }
}
