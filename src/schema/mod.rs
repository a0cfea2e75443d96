//! Table builder with optional geometry provisioning.
//!
//! A table description is validated in full, turned into `CREATE TABLE`
//! DDL and executed. When a geometry type is requested the builder then
//! registers a `GEOM` column and, only if that succeeded, builds a spatial
//! index over it. The base table is never rolled back: a geometry step that
//! returns anything but 1 is reported through the flags in
//! [`CreateTableReport`], and an engine error from either step is returned
//! with the table left in place.

mod table;
mod validate;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::connection::Session;
use crate::error::{Result, TerraError};
use crate::spatial;

/// Typed table and column descriptions.
pub use table::{ColumnSpec, TableSpec};

/// Structural checks on untyped descriptions.
pub use validate::{validate_column_structure, validate_table_structure, Validation};

/// Outcome of [`create_table`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableReport {
    /// Always `true` on success.
    pub success: bool,
    /// The base table exists.
    pub table_created: bool,
    /// Geometry column registration result; absent when no geometry was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geom_added: Option<bool>,
    /// Spatial index result; absent unless registration succeeded and the
    /// index call produced a row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geom_indexed: Option<bool>,
}

/// Creates the table described by `spec` and provisions its geometry.
///
/// # Errors
///
/// Returns [`TerraError::Validation`] before any SQL runs when `spec` breaks
/// [`TableSpec::validate`], and [`TerraError::Execution`] when the DDL or a
/// geometry call fails. A failed geometry call leaves the created table behind.
pub fn create_table(conn: &Connection, spec: &TableSpec) -> Result<CreateTableReport> {
    table::reject(spec.validate())?;
    let ddl = spec.create_table_sql();
    conn.execute_batch(&ddl)
        .map_err(|e| TerraError::execution(ddl.as_str(), e))?;
    info!(table = %spec.table_name, columns = spec.columns.len(), "schema.table_created");

    let mut report = CreateTableReport {
        success: true,
        table_created: true,
        ..CreateTableReport::default()
    };
    if let Some(geometry_type) = spec.geometry.as_deref() {
        provision_geometry(conn, &spec.table_name, geometry_type, &mut report)?;
    }
    Ok(report)
}

fn provision_geometry(
    conn: &Connection,
    table: &str,
    geometry_type: &str,
    report: &mut CreateTableReport,
) -> Result<()> {
    let added = match spatial::add_geometry_column(conn, table, geometry_type) {
        Ok(scalar) => scalar == Some(1),
        Err(err) => {
            warn!(table, step = "add_geometry_column", error = %err, "schema.geometry_failed");
            return Err(TerraError::execution(spatial::ADD_GEOMETRY_COLUMN_SQL, err));
        }
    };
    report.geom_added = Some(added);
    if !added {
        return Ok(());
    }
    info!(table, geometry_type, srid = spatial::DEFAULT_SRID, "schema.geometry_added");

    match spatial::create_spatial_index(conn, table) {
        Ok(Some(scalar)) => {
            report.geom_indexed = Some(scalar == 1);
            info!(table, indexed = scalar == 1, "schema.spatial_index");
        }
        Ok(None) => {}
        Err(err) => {
            warn!(table, step = "create_spatial_index", error = %err, "schema.geometry_failed");
            return Err(TerraError::execution(spatial::CREATE_SPATIAL_INDEX_SQL, err));
        }
    }
    Ok(())
}

impl Session {
    /// Validates an untyped table description and creates it. See [`create_table`].
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::Validation`] before any SQL runs when the
    /// description is malformed, [`TerraError::NotConnected`] without an open
    /// database, and [`TerraError::Execution`] if the DDL or a geometry call
    /// fails.
    pub fn create_table(&self, spec: &Value) -> Result<CreateTableReport> {
        let spec = TableSpec::from_value(spec)?;
        self.create_table_spec(&spec)
    }

    /// Creates a table from an already typed description.
    ///
    /// # Errors
    ///
    /// Same as [`Session::create_table`]; validation still runs first.
    pub fn create_table_spec(&self, spec: &TableSpec) -> Result<CreateTableReport> {
        table::reject(spec.validate())?;
        self.with_connection(|conn, _| create_table(conn, spec))
    }
}
