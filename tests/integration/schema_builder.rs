#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{session_with, AddGeometryCall, AddOnlySpatial, FakeSpatial, SpatialCalls};
use serde_json::{json, Value};
use tempfile::TempDir;
use terrasql::query::TypedCell;
use terrasql::schema::{validate_table_structure, ColumnSpec, TableSpec};
use terrasql::spatial::NoSpatial;
use terrasql::{ConnectRequest, Session, TerraError};

fn open_fake(dir: &TempDir, add_result: i64, index_result: i64) -> (Session, Arc<SpatialCalls>) {
    let (provider, calls) = FakeSpatial::new(add_result, index_result);
    let session = session_with(dir.path(), provider);
    session.connect(&ConnectRequest::new("schema")).expect("connect");
    (session, calls)
}

fn table_sql(session: &Session, name: &str) -> Option<String> {
    let result = session
        .execute_query(&format!(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = '{name}'"
        ))
        .expect("lookup");
    result
        .data
        .first()
        .and_then(|row| row["sql"].as_str().map(str::to_string))
}

fn user_table_count(session: &Session) -> i64 {
    let result = session
        .execute_query("SELECT count(*) AS n FROM sqlite_master WHERE type = 'table'")
        .expect("count");
    result.data[0]["n"].as_i64().expect("integer count")
}

#[test]
fn points_table_gets_geometry_and_index() {
    let dir = TempDir::new().expect("tempdir");
    let (session, calls) = open_fake(&dir, 1, 1);

    let report = session
        .create_table(&json!({
            "tableName": "pts",
            "columns": [{"name": "id", "type": "INTEGER", "constraints": ["PRIMARY KEY"]}],
            "geometry": "POINT"
        }))
        .expect("create");

    assert_eq!(
        serde_json::to_value(&report).expect("json"),
        json!({"success": true, "tableCreated": true, "geomAdded": true, "geomIndexed": true})
    );
    assert_eq!(
        table_sql(&session, "pts").as_deref(),
        Some("CREATE TABLE pts (id INTEGER PRIMARY KEY)")
    );
    assert_eq!(
        calls.add_calls(),
        vec![AddGeometryCall {
            table: "pts".into(),
            column: "GEOM".into(),
            srid: 4326,
            geometry_type: "POINT".into(),
            dimension: "XY".into(),
        }]
    );
    assert_eq!(calls.index_calls(), vec![("pts".to_string(), "GEOM".to_string())]);
}

#[test]
fn failed_registration_skips_spatial_index() {
    let dir = TempDir::new().expect("tempdir");
    let (session, calls) = open_fake(&dir, 0, 1);

    let report = session
        .create_table(&json!({
            "tableName": "zones",
            "columns": [{"name": "id", "type": "INTEGER"}],
            "geometry": "POLYGON"
        }))
        .expect("create");

    assert!(report.success);
    assert!(report.table_created);
    assert_eq!(report.geom_added, Some(false));
    assert_eq!(report.geom_indexed, None);
    assert_eq!(calls.add_calls().len(), 1);
    assert!(calls.index_calls().is_empty());
    assert!(table_sql(&session, "zones").is_some());
}

#[test]
fn index_result_other_than_one_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let (session, _calls) = open_fake(&dir, 1, 0);
    let report = session
        .create_table_spec(
            &TableSpec::new("lines")
                .column(ColumnSpec::new("id", "INTEGER"))
                .geometry("LINESTRING"),
        )
        .expect("create");
    assert_eq!(report.geom_added, Some(true));
    assert_eq!(report.geom_indexed, Some(false));
}

#[test]
fn absent_geometry_never_touches_spatial_functions() {
    let dir = TempDir::new().expect("tempdir");
    let (session, calls) = open_fake(&dir, 1, 1);

    let report = session
        .create_table(&json!({
            "tableName": "plain",
            "columns": [
                {"name": "id", "type": "INTEGER", "constraints": ["PRIMARY KEY", "AUTOINCREMENT"]},
                {"name": "name", "type": "TEXT", "constraints": ["NOT NULL"]},
                {"name": "score", "type": "REAL"}
            ]
        }))
        .expect("create");

    let json = serde_json::to_value(&report).expect("json");
    let obj = json.as_object().expect("object");
    assert!(!obj.contains_key("geomAdded"));
    assert!(!obj.contains_key("geomIndexed"));
    assert!(calls.add_calls().is_empty());
    assert!(calls.index_calls().is_empty());
    assert_eq!(
        table_sql(&session, "plain").as_deref(),
        Some(
            "CREATE TABLE plain \
             (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, score REAL)"
        )
    );
}

#[test]
fn invalid_spec_runs_no_sql() {
    let dir = TempDir::new().expect("tempdir");
    let (session, calls) = open_fake(&dir, 1, 1);
    let before = user_table_count(&session);

    let spec = json!({"tableName": "", "columns": []});
    let validation = validate_table_structure(&spec);
    assert_eq!(validation.reason(), Some("tableName cannot be empty or null"));

    let err = session.create_table(&spec).unwrap_err();
    assert!(matches!(err, TerraError::Validation { .. }));
    assert_eq!(err.to_string(), "tableName cannot be empty or null");

    let err = session
        .create_table(&json!({
            "tableName": "half",
            "columns": [
                {"name": "id", "type": "INTEGER"},
                {"name": "broken", "constraints": ["NOT NULL"]}
            ],
            "geometry": "POINT"
        }))
        .unwrap_err();
    assert_eq!(err.to_string(), "column must have name and type");

    assert_eq!(user_table_count(&session), before);
    assert!(calls.add_calls().is_empty());
}

#[test]
fn ddl_failure_aborts_before_geometry() {
    let dir = TempDir::new().expect("tempdir");
    let (session, calls) = open_fake(&dir, 1, 1);
    let spec = json!({
        "tableName": "dup",
        "columns": [{"name": "id", "type": "INTEGER"}],
        "geometry": "POINT"
    });
    session.create_table(&spec).expect("first create");
    let err = session.create_table(&spec).unwrap_err();
    assert!(matches!(err, TerraError::Execution { .. }));
    assert!(err.to_string().contains("already exists"), "{err}");
    assert_eq!(calls.add_calls().len(), 1);
}

#[test]
fn geometry_engine_error_is_returned_and_table_kept() {
    let dir = TempDir::new().expect("tempdir");
    let session = session_with(dir.path(), NoSpatial);
    session.connect(&ConnectRequest::new("plain")).expect("connect");

    let err = session
        .create_table(&json!({
            "tableName": "pts",
            "columns": [{"name": "id", "type": "INTEGER"}],
            "geometry": "POINT"
        }))
        .unwrap_err();
    match &err {
        TerraError::Execution { sql, .. } => assert!(sql.contains("AddGeometryColumn"), "{sql}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("no such function"), "{err}");
    assert!(table_sql(&session, "pts").is_some());

    session
        .execute_bulk("INSERT INTO pts (id) VALUES (7)")
        .expect("base table usable");
    let rows = session.execute_query("SELECT id FROM pts").expect("query");
    assert_eq!(rows.data[0]["id"], TypedCell::Integer(7));
}

#[test]
fn typed_spec_with_blank_fields_runs_no_sql() {
    let dir = TempDir::new().expect("tempdir");
    let (session, calls) = open_fake(&dir, 1, 1);
    let before = user_table_count(&session);

    let cases = [
        (
            TableSpec::new("   ").column(ColumnSpec::new("id", "INTEGER")),
            "tableName cannot be empty or null",
        ),
        (
            TableSpec::new("t").column(ColumnSpec::new("id", "")),
            "column type must be a valid string",
        ),
        (
            TableSpec::new("t")
                .column(ColumnSpec::new("", "INTEGER"))
                .geometry("POINT"),
            "column name must be a valid string",
        ),
    ];
    for (spec, reason) in cases {
        let err = session.create_table_spec(&spec).unwrap_err();
        assert!(matches!(err, TerraError::Validation { .. }), "{err:?}");
        assert_eq!(err.to_string(), reason);
    }

    assert_eq!(user_table_count(&session), before);
    assert!(calls.add_calls().is_empty());
}

#[test]
fn spatial_index_engine_error_is_returned() {
    let dir = TempDir::new().expect("tempdir");
    let session = session_with(dir.path(), AddOnlySpatial);
    session.connect(&ConnectRequest::new("half")).expect("connect");

    let err = session
        .create_table_spec(
            &TableSpec::new("roads")
                .column(ColumnSpec::new("id", "INTEGER"))
                .geometry("LINESTRING"),
        )
        .unwrap_err();
    match &err {
        TerraError::Execution { sql, .. } => assert!(sql.contains("CreateSpatialIndex"), "{sql}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(table_sql(&session, "roads").is_some());
}

#[test]
fn create_table_requires_connection() {
    let dir = TempDir::new().expect("tempdir");
    let session = session_with(dir.path(), NoSpatial);
    let err = session
        .create_table(&json!({"tableName": "t", "columns": [{"name": "id", "type": "INTEGER"}]}))
        .unwrap_err();
    assert!(matches!(err, TerraError::NotConnected));

    // Validation still comes first.
    let err = session.create_table(&Value::Null).unwrap_err();
    assert!(matches!(err, TerraError::Validation { .. }));
}
