use std::time::Instant;

use indexmap::IndexMap;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CellOptions;
use crate::connection::Session;
use crate::error::{Result, TerraError};
use crate::query::cell::{render_text, TypedCell};

/// One produced row keyed by lower-cased column name, in column order.
pub type RowView = IndexMap<String, TypedCell>;

/// Rows produced by [`execute_query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    /// Number of produced rows.
    #[serde(rename = "rows")]
    pub row_count: usize,
    /// Column count latched from the first row; zero when no row was produced.
    #[serde(rename = "cols")]
    pub col_count: usize,
    /// Produced rows in order.
    pub data: Vec<RowView>,
}

/// Result of the single-step [`execute_update`] path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    /// Column count of the first row, absent when the statement produced none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// First column of the first row as text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Result of [`execute_bulk`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    /// Rows changed by this statement; zero unless it was an INSERT, UPDATE
    /// or DELETE that touched rows.
    pub changes: u64,
    /// Rows the statement produced while stepping to completion.
    pub rows_stepped: usize,
}

/// Runs `sql` to exhaustion and types every cell.
///
/// # Errors
///
/// Returns [`TerraError::Query`] if the statement fails to prepare or step.
pub fn execute_query(conn: &Connection, sql: &str, opts: &CellOptions) -> Result<ResultSet> {
    let start = Instant::now();
    let mut stmt = conn.prepare(sql).map_err(|e| TerraError::query(sql, e))?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_lowercase)
        .collect();
    let mut rows = stmt.query([]).map_err(|e| TerraError::query(sql, e))?;

    let mut result = ResultSet::default();
    let mut collision_reported = false;
    while let Some(row) = rows.next().map_err(|e| TerraError::query(sql, e))? {
        result.row_count += 1;
        if result.col_count == 0 {
            result.col_count = names.len();
        }
        let mut view = RowView::with_capacity(result.col_count);
        for (idx, name) in names.iter().enumerate().take(result.col_count) {
            let value = row.get_ref(idx).map_err(|e| TerraError::query(sql, e))?;
            let cell = TypedCell::from_value_ref(value, opts);
            if view.insert(name.clone(), cell).is_some() && !collision_reported {
                collision_reported = true;
                warn!(column = %name, "query.column_collision");
            }
        }
        result.data.push(view);
    }

    debug!(
        rows = result.row_count,
        cols = result.col_count,
        elapsed_ms = start.elapsed().as_secs_f64() * 1_000.0,
        "query.execute"
    );
    Ok(result)
}

/// Steps `sql` exactly once.
///
/// Meant for scalar-returning DML; a statement that would produce several
/// rows is not driven past the first. Use [`execute_bulk`] for those.
///
/// # Errors
///
/// Returns [`TerraError::Query`] if the statement fails to prepare or step.
pub fn execute_update(conn: &Connection, sql: &str) -> Result<UpdateOutcome> {
    let mut stmt = conn.prepare(sql).map_err(|e| TerraError::query(sql, e))?;
    let column_count = stmt.column_count();
    let mut rows = stmt.query([]).map_err(|e| TerraError::query(sql, e))?;
    let outcome = match rows.next().map_err(|e| TerraError::query(sql, e))? {
        Some(row) => {
            let data = if column_count > 0 {
                let value = row.get_ref(0).map_err(|e| TerraError::query(sql, e))?;
                render_text(conn, value).map_err(|e| TerraError::query(sql, e))?
            } else {
                None
            };
            UpdateOutcome {
                count: Some(column_count),
                data,
            }
        }
        None => UpdateOutcome::default(),
    };
    debug!(count = ?outcome.count, "query.update");
    Ok(outcome)
}

/// Steps `sql` to completion, discarding produced rows, and reports changes.
///
/// # Errors
///
/// Returns [`TerraError::Query`] if the statement fails to prepare or step.
pub fn execute_bulk(conn: &Connection, sql: &str) -> Result<BulkOutcome> {
    let before = total_changes(conn).map_err(|e| TerraError::query(sql, e))?;
    let mut stmt = conn.prepare(sql).map_err(|e| TerraError::query(sql, e))?;
    let mut rows = stmt.query([]).map_err(|e| TerraError::query(sql, e))?;
    let mut rows_stepped = 0;
    while rows
        .next()
        .map_err(|e| TerraError::query(sql, e))?
        .is_some()
    {
        rows_stepped += 1;
    }
    drop(rows);
    // `changes()` keeps the last DML count across DDL and SELECTs.
    let after = total_changes(conn).map_err(|e| TerraError::query(sql, e))?;
    let outcome = BulkOutcome {
        changes: if after == before { 0 } else { conn.changes() },
        rows_stepped,
    };
    debug!(
        changes = outcome.changes,
        rows_stepped = outcome.rows_stepped,
        "query.bulk"
    );
    Ok(outcome)
}

fn total_changes(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT total_changes()", [], |row| row.get(0))
}

impl Session {
    /// Runs a read query on the open database. See [`execute_query`].
    pub fn execute_query(&self, sql: &str) -> Result<ResultSet> {
        self.with_connection(|conn, config| execute_query(conn, sql, &config.cells))
    }

    /// Runs a single-step update on the open database. See [`execute_update`].
    pub fn execute_update(&self, sql: &str) -> Result<UpdateOutcome> {
        self.with_connection(|conn, _| execute_update(conn, sql))
    }

    /// Runs a statement to completion on the open database. See [`execute_bulk`].
    pub fn execute_bulk(&self, sql: &str) -> Result<BulkOutcome> {
        self.with_connection(|conn, _| execute_bulk(conn, sql))
    }
}
