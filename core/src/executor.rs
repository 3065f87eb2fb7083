//! Query Execution Module
//!
//! Runs a generated SELECT against the SQLite file and folds every
//! driver-level failure into a tagged [`SqlResult`]; nothing raises
//! past this boundary. A connection is opened read-only per call; there
//! is no pooling and no cross-request transaction state.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use tracing::{debug, warn};

/// Successful query output: ordered column names plus row tuples with
/// cells already converted to JSON values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flatten rows into column→value records (one map per row)
    pub fn records(&self) -> Vec<Map<String, JsonValue>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Render one record per line, for prompt embedding
    pub fn summary_text(&self) -> String {
        self.records()
            .into_iter()
            .map(|record| JsonValue::Object(record).to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Tagged outcome of one query execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SqlResult {
    Success(QueryRows),
    Failure { error: String },
}

impl SqlResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SqlResult::Success(_))
    }

    pub fn rows(&self) -> Option<&QueryRows> {
        match self {
            SqlResult::Success(rows) => Some(rows),
            SqlResult::Failure { .. } => None,
        }
    }
}

/// Execute `sql` against the database at `db_path`.
///
/// Every rusqlite error (syntax, missing table, type mismatch, open
/// failure) becomes `SqlResult::Failure` carrying the driver message.
pub fn execute_query(db_path: &Path, sql: &str) -> SqlResult {
    debug!("Executing query: {sql}");
    match try_execute(db_path, sql) {
        Ok(rows) => {
            debug!("Query returned {} rows", rows.rows.len());
            SqlResult::Success(rows)
        }
        Err(e) => {
            warn!("Query execution failed: {e}");
            SqlResult::Failure {
                error: e.to_string(),
            }
        }
    }
}

fn try_execute(db_path: &Path, sql: &str) -> Result<QueryRows, rusqlite::Error> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(sql)?;

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let rows = stmt
        .query_map([], |row| {
            let mut cells = Vec::with_capacity(column_count);
            for index in 0..column_count {
                cells.push(cell_to_json(row.get_ref(index)?));
            }
            Ok(cells)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QueryRows { columns, rows })
}

fn cell_to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(t) => JsonValue::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => JsonValue::String(format!("<blob {} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::seed_database;

    #[test]
    fn test_empty_result_keeps_full_column_list() {
        let db = seed_database();
        let result = execute_query(db.path(), "SELECT * FROM tickets WHERE 1=0");

        let rows = result.rows().expect("query should succeed");
        assert!(rows.is_empty());
        assert_eq!(rows.columns, vec!["id", "location_id", "vehicle", "createdat"]);
    }

    #[test]
    fn test_missing_table_failure_names_table() {
        let db = seed_database();
        let result = execute_query(db.path(), "SELECT * FROM reservations");

        match result {
            SqlResult::Failure { error } => assert!(error.contains("reservations")),
            SqlResult::Success(_) => panic!("expected a database failure"),
        }
    }

    #[test]
    fn test_aggregate_query() {
        let db = seed_database();
        let result = execute_query(
            db.path(),
            "SELECT COUNT(*) AS ticket_count FROM tickets WHERE location_id = 1",
        );

        let rows = result.rows().unwrap();
        assert_eq!(rows.columns, vec!["ticket_count"]);
        assert_eq!(rows.rows, vec![vec![JsonValue::from(2)]]);
    }

    #[test]
    fn test_join_query_returns_cells_as_json() {
        let db = seed_database();
        let result = execute_query(
            db.path(),
            "SELECT t.id, l.name FROM tickets t \
             JOIN locations l ON t.location_id = l.id ORDER BY t.id",
        );

        let rows = result.rows().unwrap();
        assert_eq!(rows.rows.len(), 3);
        assert_eq!(rows.rows[0], vec![JsonValue::from(101), JsonValue::from("Harbor East")]);
    }

    #[test]
    fn test_null_cells_become_json_null() {
        let db = seed_database();
        let conn = Connection::open(db.path()).unwrap();
        conn.execute(
            "INSERT INTO tickets (id, location_id, vehicle, createdat)
             VALUES (999, 2, NULL, '2024-10-03 08:00:00')",
            [],
        )
        .unwrap();
        drop(conn);

        let result = execute_query(db.path(), "SELECT vehicle FROM tickets WHERE id = 999");
        assert_eq!(result.rows().unwrap().rows[0][0], JsonValue::Null);
    }

    #[test]
    fn test_records_zip_columns_and_cells() {
        let rows = QueryRows {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![JsonValue::from(1), JsonValue::from("Harbor East")]],
        };

        let records = rows.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], JsonValue::from(1));
        assert_eq!(records[0]["name"], JsonValue::from("Harbor East"));
    }

    #[test]
    fn test_summary_text_one_record_per_line() {
        let rows = QueryRows {
            columns: vec!["n".to_string()],
            rows: vec![vec![JsonValue::from(1)], vec![JsonValue::from(2)]],
        };
        let summary = rows.summary_text();
        assert_eq!(summary.lines().count(), 2);
        assert!(summary.lines().next().unwrap().contains("\"n\":1"));
    }

    #[test]
    fn test_syntax_error_is_failure() {
        let db = seed_database();
        let result = execute_query(db.path(), "SELEC * FROM tickets");
        assert!(!result.is_success());
    }
}
