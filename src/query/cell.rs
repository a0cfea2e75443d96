use rusqlite::types::{Type, ValueRef};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::{BlobRendering, CellOptions, IntegerWidth};

/// One typed result value.
///
/// Serializes untagged: text and unrecognized cells become strings, numbers
/// stay numbers, and `Null` becomes `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedCell {
    /// TEXT storage class.
    Text(String),
    /// INTEGER storage class.
    Integer(i64),
    /// REAL storage class.
    Float(f64),
    /// NULL.
    Null,
    /// Any other storage class, carried in its text form.
    Unrecognized(String),
}

impl TypedCell {
    /// Converts a raw engine value. Never fails; unknown tags fall back to text.
    pub fn from_value_ref(value: ValueRef<'_>, opts: &CellOptions) -> Self {
        match value {
            ValueRef::Text(bytes) => TypedCell::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Integer(v) => TypedCell::Integer(match opts.integer_width {
                IntegerWidth::Wide => v,
                IntegerWidth::Narrow32 => i64::from(v as i32),
            }),
            ValueRef::Real(v) => TypedCell::Float(v),
            ValueRef::Null => TypedCell::Null,
            ValueRef::Blob(bytes) => TypedCell::Unrecognized(match opts.blob_rendering {
                BlobRendering::Text => String::from_utf8_lossy(bytes).into_owned(),
                BlobRendering::Hex => hex::encode(bytes),
            }),
        }
    }

    /// Engine storage class this cell was read from.
    ///
    /// `Unrecognized` reports [`Type::Blob`], the only storage class outside
    /// the typed set.
    pub fn source_type(&self) -> Type {
        match self {
            TypedCell::Text(_) => Type::Text,
            TypedCell::Integer(_) => Type::Integer,
            TypedCell::Float(_) => Type::Real,
            TypedCell::Null => Type::Null,
            TypedCell::Unrecognized(_) => Type::Blob,
        }
    }

    /// True for [`TypedCell::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, TypedCell::Null)
    }

    /// Text payload for `Text` and `Unrecognized` cells.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedCell::Text(s) | TypedCell::Unrecognized(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedCell::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Float payload.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedCell::Float(v) => Some(*v),
            _ => None,
        }
    }
}

const REAL_AS_TEXT_SQL: &str = "SELECT CAST(?1 AS TEXT)";

/// Renders a value the way the engine's string accessor does; `None` for NULL.
///
/// Reals are cast by the engine itself, which prints 15 significant digits.
pub(crate) fn render_text(
    conn: &Connection,
    value: ValueRef<'_>,
) -> rusqlite::Result<Option<String>> {
    Ok(match value {
        ValueRef::Null => None,
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => conn.query_row(REAL_AS_TEXT_SQL, [v], |row| row.get(0))?,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    })
}
