//! Embedded SQLite/SpatiaLite access layer.
//!
//! A [`Session`] owns one on-device database handle. Queries come back as
//! typed rows ([`query::ResultSet`]), and the [`schema`] builder turns a
//! structured table description into DDL, optionally layering a geometry
//! column and spatial index on top.
//!
//! ```no_run
//! use serde_json::json;
//! use terrasql::{ConnectRequest, Session, TerraConfig};
//!
//! # fn main() -> terrasql::Result<()> {
//! let session = Session::new(TerraConfig::load(None)?);
//! session.connect(&ConnectRequest::new("survey"))?;
//! let report = session.create_table(&json!({
//!     "tableName": "pts",
//!     "columns": [{"name": "id", "type": "INTEGER", "constraints": ["PRIMARY KEY"]}],
//!     "geometry": "POINT"
//! }))?;
//! assert!(report.table_created);
//! let rows = session.execute_query("SELECT id FROM pts")?;
//! println!("{} rows", rows.row_count);
//! session.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod connection;
mod error;
pub mod logging;
pub mod query;
pub mod schema;
pub mod spatial;

pub use config::TerraConfig;
pub use connection::{CloseReport, ConnectReport, ConnectRequest, Session};
pub use error::{Result, TerraError};
