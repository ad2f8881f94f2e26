//! SQLite loading.
//!
//! The target store is a single local database file. Each clean table fully
//! replaces any existing table of the same name — no merge, no upsert. The
//! connection is released on every exit path: rusqlite closes on drop, and
//! an uncommitted transaction rolls back when dropped.

use crate::error::PipelineError;
use crate::table::{Table, Value};
use rusqlite::types::{Null, ToSqlOutput};
use rusqlite::{Connection, ToSql};
use std::fs;
use std::path::Path;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(Null),
            Value::Int(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// The target store: one SQLite file holding zero or more named tables.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the store, creating the file (and its parent directory) if absent.
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Replace the entire contents of `name` with `table`.
    ///
    /// Column order is preserved and affinities are inferred from the data.
    /// Drop, create, and all inserts run inside one transaction.
    pub fn replace_table(&mut self, name: &str, table: &Table) -> Result<(), PipelineError> {
        let quoted = quote_ident(name);
        let column_sql: Vec<String> = table
            .columns()
            .iter()
            .zip(table.column_types())
            .map(|(column, ty)| format!("{} {}", quote_ident(column), ty.sql()))
            .collect();
        let placeholders: Vec<String> =
            (1..=table.columns().len()).map(|i| format!("?{i}")).collect();

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {quoted}"), [])?;
        tx.execute(
            &format!("CREATE TABLE {quoted} ({})", column_sql.join(", ")),
            [],
        )?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {quoted} VALUES ({})",
                placeholders.join(", ")
            ))?;
            for row in table.rows() {
                stmt.execute(rusqlite::params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Names of all user tables, sorted.
    pub fn table_names(&self) -> Result<Vec<String>, PipelineError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn row_count(&self, name: &str) -> Result<i64, PipelineError> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Double-quote an identifier for use in DDL. Embedded quotes are doubled.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
