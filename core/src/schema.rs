//! Schema Introspection Module
//!
//! Reads table, column, and foreign-key metadata out of a SQLite file
//! once at startup. The result is treated as immutable for the process
//! lifetime; a schema change requires a restart. Introspection never
//! fails the caller: an unreadable database or an empty one yields an
//! empty mapping and a warning in the log.

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Single column of an introspected table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Declared SQL type (as written in the CREATE TABLE)
    pub decl_type: String,
    /// True unless the column carries NOT NULL
    pub nullable: bool,
    /// True when the column is part of the primary key
    pub primary_key: bool,
}

/// Foreign-key edge from one table column to another table's column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referencing column in this table
    pub from_column: String,
    /// Referenced table
    pub to_table: String,
    /// Referenced column
    pub to_column: String,
}

/// Full description of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,
    /// Outgoing foreign-key relationships
    pub foreign_keys: Vec<ForeignKey>,
}

/// Table name to schema, sorted by name so iteration is deterministic
pub type SchemaMap = BTreeMap<String, TableSchema>;

/// Introspect every user table in the database at `db_path`.
///
/// Internal `sqlite_*` tables are skipped. Returns an empty map when
/// the file cannot be opened or contains no tables.
pub fn load_schema(db_path: &Path) -> SchemaMap {
    match try_load_schema(db_path) {
        Ok(map) => {
            if map.is_empty() {
                warn!("No tables found in database: {}", db_path.display());
            } else {
                debug!("Loaded schema for {} tables", map.len());
            }
            map
        }
        Err(e) => {
            warn!("Failed to load schema from {}: {e}", db_path.display());
            SchemaMap::new()
        }
    }
}

fn try_load_schema(db_path: &Path) -> Result<SchemaMap, rusqlite::Error> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut map = SchemaMap::new();

    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name;",
    )?;
    let table_names: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    for table_name in table_names {
        let columns = load_columns(&conn, &table_name)?;
        let foreign_keys = load_foreign_keys(&conn, &table_name)?;
        map.insert(
            table_name.clone(),
            TableSchema {
                name: table_name,
                columns,
                foreign_keys,
            },
        );
    }

    Ok(map)
}

fn load_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>, rusqlite::Error> {
    // PRAGMA table_info: (cid, name, type, notnull, dflt_value, pk)
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\");"))?;
    let columns = stmt
        .query_map([], |row| {
            let notnull: i64 = row.get(3)?;
            let pk: i64 = row.get(5)?;
            Ok(ColumnInfo {
                name: row.get(1)?,
                decl_type: row.get(2)?,
                nullable: notnull == 0,
                primary_key: pk > 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn load_foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKey>, rusqlite::Error> {
    // PRAGMA foreign_key_list: (id, seq, table, from, to, ...).
    // "to" is NULL when the reference targets the other table's implicit
    // primary key.
    let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list(\"{table}\");"))?;
    let keys = stmt
        .query_map([], |row| {
            let to_column: Option<String> = row.get(4)?;
            Ok(ForeignKey {
                to_table: row.get(2)?,
                from_column: row.get(3)?,
                to_column: to_column.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}
