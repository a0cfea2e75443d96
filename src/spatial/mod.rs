//! Spatial extension seam.
//!
//! The SQL engine only gains geometry functions once an extension has been
//! installed on the connection. [`SpatialProvider`] is invoked right after a
//! database is opened; the default [`Spatialite`] provider loads
//! `mod_spatialite` at runtime.

use std::path::PathBuf;

use rusqlite::types::ValueRef;
use rusqlite::{named_params, Connection, LoadExtensionGuard, Params};

/// Well-known table whose absence means spatial metadata was never initialized.
pub const MARKER_TABLE: &str = "spatial_ref_sys";
/// Column name used for provisioned geometry.
pub const GEOMETRY_COLUMN: &str = "GEOM";
/// Spatial reference identifier (WGS 84).
pub const DEFAULT_SRID: i64 = 4326;
/// Dimensionality of provisioned geometry.
pub const DEFAULT_DIMENSION: &str = "XY";

pub(crate) const PROBE_SQL: &str = "select count(1) from spatial_ref_sys limit 1";
pub(crate) const INIT_METADATA_SQL: &str = "SELECT InitSpatialMetaData(1)";
pub(crate) const ADD_GEOMETRY_COLUMN_SQL: &str =
    "SELECT AddGeometryColumn(@table, @column, @srid, @geom_type, @dimension)";
pub(crate) const CREATE_SPATIAL_INDEX_SQL: &str = "SELECT CreateSpatialIndex(@table, @column)";

/// Installs spatial functions on a freshly opened connection.
pub trait SpatialProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Makes the spatial SQL functions available on `conn`.
    fn install(&self, conn: &Connection) -> rusqlite::Result<()>;

    /// Whether a missing marker table should be bootstrapped on connect.
    fn bootstraps_metadata(&self) -> bool {
        true
    }
}

/// Loads SpatiaLite as a runtime extension.
#[derive(Debug, Clone)]
pub struct Spatialite {
    library: PathBuf,
    entry_point: Option<String>,
}

impl Spatialite {
    /// Library name resolved by the platform loader.
    pub const DEFAULT_LIBRARY: &'static str = "mod_spatialite";

    /// Creates a loader for `library` with an optional entry point symbol.
    pub fn new(library: impl Into<PathBuf>, entry_point: Option<String>) -> Self {
        Self {
            library: library.into(),
            entry_point,
        }
    }
}

impl Default for Spatialite {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIBRARY, None)
    }
}

impl SpatialProvider for Spatialite {
    fn name(&self) -> &str {
        "spatialite"
    }

    #[allow(unsafe_code)]
    fn install(&self, conn: &Connection) -> rusqlite::Result<()> {
        // SAFETY: the library path comes from trusted configuration and the
        // guard disables extension loading again before returning.
        unsafe {
            let _guard = LoadExtensionGuard::new(conn)?;
            conn.load_extension(&self.library, self.entry_point.as_deref())
        }
    }
}

/// Plain SQLite without spatial functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpatial;

impl SpatialProvider for NoSpatial {
    fn name(&self) -> &str {
        "none"
    }

    fn install(&self, _conn: &Connection) -> rusqlite::Result<()> {
        Ok(())
    }

    fn bootstraps_metadata(&self) -> bool {
        false
    }
}

/// Outcome of the marker-table probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    /// The probe ran; `true` when it produced a row.
    Ran(bool),
    /// The marker table does not exist yet.
    MarkerMissing,
}

pub(crate) fn probe(conn: &Connection) -> rusqlite::Result<Probe> {
    match first_scalar(conn, PROBE_SQL, []) {
        Ok(row) => Ok(Probe::Ran(row.is_some())),
        Err(err) if is_missing_marker(&err) => Ok(Probe::MarkerMissing),
        Err(err) => Err(err),
    }
}

fn is_missing_marker(err: &rusqlite::Error) -> bool {
    let needle = format!("no such table: {MARKER_TABLE}");
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.trim().starts_with(&needle),
        other => other.to_string().trim().starts_with(&needle),
    }
}

pub(crate) fn init_metadata(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    first_scalar(conn, INIT_METADATA_SQL, [])
}

pub(crate) fn add_geometry_column(
    conn: &Connection,
    table: &str,
    geometry_type: &str,
) -> rusqlite::Result<Option<i64>> {
    first_scalar(
        conn,
        ADD_GEOMETRY_COLUMN_SQL,
        named_params! {
            "@table": table,
            "@column": GEOMETRY_COLUMN,
            "@srid": DEFAULT_SRID,
            "@geom_type": geometry_type,
            "@dimension": DEFAULT_DIMENSION,
        },
    )
}

pub(crate) fn create_spatial_index(
    conn: &Connection,
    table: &str,
) -> rusqlite::Result<Option<i64>> {
    first_scalar(
        conn,
        CREATE_SPATIAL_INDEX_SQL,
        named_params! {
            "@table": table,
            "@column": GEOMETRY_COLUMN,
        },
    )
}

/// Prepares `sql`, steps once, and reads column 0 through [`scalar_int`].
fn first_scalar<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<Option<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let value = scalar_int(row.get_ref(0)?);
    Ok(Some(value))
}

/// Reads a cell the way SQLite's `column_int` accessor does.
///
/// Text and blobs yield their leading integer prefix after optional
/// whitespace and sign (`"1abc"` is 1, `"2.9"` is 2); no digits yields 0.
/// Out-of-range values saturate.
pub(crate) fn scalar_int(value: ValueRef<'_>) -> i64 {
    match value {
        ValueRef::Integer(v) => v,
        ValueRef::Real(v) => v as i64,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => leading_int(bytes),
        ValueRef::Null => 0,
    }
}

fn leading_int(bytes: &[u8]) -> i64 {
    let mut rest = bytes;
    while let [b, tail @ ..] = rest {
        if !b.is_ascii_whitespace() {
            break;
        }
        rest = tail;
    }
    let negative = match rest {
        [b'-', tail @ ..] => {
            rest = tail;
            true
        }
        [b'+', tail @ ..] => {
            rest = tail;
            false
        }
        _ => false,
    };
    let mut magnitude: i128 = 0;
    for digit in rest.iter().take_while(|b| b.is_ascii_digit()) {
        magnitude = (magnitude * 10 + i128::from(digit - b'0')).min(i128::from(u64::MAX));
    }
    let signed = if negative { -magnitude } else { magnitude };
    signed.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
