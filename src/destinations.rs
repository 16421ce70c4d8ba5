//! Destinations Catalogue
//! Mission: Read and seed the time-travel destinations table

use crate::db::Database;
use anyhow::{Context, Result};
use rusqlite::params;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Destination {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub description: String,
}

#[derive(Clone)]
pub struct DestinationRepo {
    db: Database,
}

impl DestinationRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn list_all(&self) -> Result<Vec<Destination>> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare("SELECT id, name, year, description FROM destinations ORDER BY id")
            .context("prepare destinations query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Destination {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    year: row.get(2)?,
                    description: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("read destinations")?;
        Ok(rows)
    }

    /// Insert each destination whose id is not present yet. Existing rows are
    /// left as they are. Returns the number of rows inserted.
    pub fn insert_if_absent(&self, destinations: &[Destination]) -> Result<usize> {
        let mut conn = self.db.conn();
        let tx = conn.transaction().context("begin seed transaction")?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO destinations (id, name, year, description)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO NOTHING",
            )?;
            for d in destinations {
                inserted += stmt
                    .execute(params![d.id, d.name, d.year, d.description])
                    .with_context(|| format!("insert destination {}", d.id))?;
            }
        }
        tx.commit().context("commit seed transaction")?;
        Ok(inserted)
    }
}
