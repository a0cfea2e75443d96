#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use terrasql::spatial::SpatialProvider;
use terrasql::{Session, TerraConfig};

/// Arguments seen by the stand-in `AddGeometryColumn`.
#[derive(Debug, Clone, PartialEq)]
pub struct AddGeometryCall {
    pub table: String,
    pub column: String,
    pub srid: i64,
    pub geometry_type: String,
    pub dimension: String,
}

#[derive(Debug, Default)]
pub struct SpatialCalls {
    pub init: AtomicUsize,
    pub add: Mutex<Vec<AddGeometryCall>>,
    pub index: Mutex<Vec<(String, String)>>,
}

impl SpatialCalls {
    pub fn init_count(&self) -> usize {
        self.init.load(Ordering::SeqCst)
    }

    pub fn add_calls(&self) -> Vec<AddGeometryCall> {
        self.add.lock().expect("add calls").clone()
    }

    pub fn index_calls(&self) -> Vec<(String, String)> {
        self.index.lock().expect("index calls").clone()
    }
}

/// Registers scalar-function stand-ins for the spatial extension.
pub struct FakeSpatial {
    pub calls: Arc<SpatialCalls>,
    pub add_result: i64,
    pub index_result: i64,
}

impl FakeSpatial {
    pub fn new(add_result: i64, index_result: i64) -> (Self, Arc<SpatialCalls>) {
        let calls = Arc::new(SpatialCalls::default());
        (
            Self {
                calls: Arc::clone(&calls),
                add_result,
                index_result,
            },
            calls,
        )
    }
}

impl SpatialProvider for FakeSpatial {
    fn name(&self) -> &str {
        "fake"
    }

    fn install(&self, conn: &Connection) -> rusqlite::Result<()> {
        let calls = Arc::clone(&self.calls);
        conn.create_scalar_function(
            "InitSpatialMetaData",
            1,
            FunctionFlags::SQLITE_UTF8,
            move |_ctx| {
                calls.init.fetch_add(1, Ordering::SeqCst);
                Ok(1i64)
            },
        )?;

        let calls = Arc::clone(&self.calls);
        let add_result = self.add_result;
        conn.create_scalar_function(
            "AddGeometryColumn",
            5,
            FunctionFlags::SQLITE_UTF8,
            move |ctx| {
                let call = AddGeometryCall {
                    table: ctx.get::<String>(0)?,
                    column: ctx.get::<String>(1)?,
                    srid: ctx.get::<i64>(2)?,
                    geometry_type: ctx.get::<String>(3)?,
                    dimension: ctx.get::<String>(4)?,
                };
                calls.add.lock().expect("add calls").push(call);
                Ok(add_result)
            },
        )?;

        let calls = Arc::clone(&self.calls);
        let index_result = self.index_result;
        conn.create_scalar_function(
            "CreateSpatialIndex",
            2,
            FunctionFlags::SQLITE_UTF8,
            move |ctx| {
                let entry = (ctx.get::<String>(0)?, ctx.get::<String>(1)?);
                calls.index.lock().expect("index calls").push(entry);
                Ok(index_result)
            },
        )
    }
}

/// Registers bootstrap and `AddGeometryColumn` stand-ins but no `CreateSpatialIndex`.
pub struct AddOnlySpatial;

impl SpatialProvider for AddOnlySpatial {
    fn name(&self) -> &str {
        "add-only"
    }

    fn install(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.create_scalar_function(
            "InitSpatialMetaData",
            1,
            FunctionFlags::SQLITE_UTF8,
            |_ctx| Ok(1i64),
        )?;
        conn.create_scalar_function(
            "AddGeometryColumn",
            5,
            FunctionFlags::SQLITE_UTF8,
            |_ctx| Ok(1i64),
        )
    }
}

/// Provider that asks for a bootstrap but installs no functions.
pub struct BareSpatial;

impl SpatialProvider for BareSpatial {
    fn name(&self) -> &str {
        "bare"
    }

    fn install(&self, _conn: &Connection) -> rusqlite::Result<()> {
        Ok(())
    }
}

pub fn config_for(dir: &Path) -> TerraConfig {
    let mut config = TerraConfig::default();
    config.storage.default_dir = Some(dir.to_path_buf());
    config.storage.external_root = Some(dir.to_path_buf());
    config
}

pub fn session_with(dir: &Path, provider: impl SpatialProvider + 'static) -> Session {
    Session::with_provider(config_for(dir), Box::new(provider))
}

pub fn seed_marker_table(path: &Path) {
    Connection::open(path)
        .expect("open seed")
        .execute_batch("CREATE TABLE spatial_ref_sys (srid INTEGER PRIMARY KEY, auth_name TEXT);")
        .expect("seed marker");
}
