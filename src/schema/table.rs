use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, TerraError};
use crate::schema::validate::{
    validate_column_structure, validate_table_structure, Validation, COLUMN_NAME_INVALID,
    COLUMN_TYPE_INVALID, GEOMETRY_INVALID, TABLE_NAME_REQUIRED,
};

/// One column of a [`TableSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    /// Column identifier, emitted as-is.
    pub name: String,
    /// Declared type, emitted as-is.
    #[serde(rename = "type")]
    pub ty: String,
    /// Constraint clauses emitted after the type, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
}

impl ColumnSpec {
    /// Column without constraints.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            constraints: Vec::new(),
        }
    }

    /// Appends a constraint clause.
    pub fn constraint(mut self, clause: impl Into<String>) -> Self {
        self.constraints.push(clause.into());
        self
    }

    fn definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.ty);
        for clause in &self.constraints {
            def.push(' ');
            def.push_str(clause);
        }
        def
    }
}

/// Validated description of a table to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    /// Table identifier, trimmed.
    pub table_name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSpec>,
    /// Geometry type keyword (`POINT`, `POLYGON`, ...) to provision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
}

impl TableSpec {
    /// Table with no columns yet.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into().trim().to_string(),
            columns: Vec::new(),
            geometry: None,
        }
    }

    /// Appends a column.
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Requests a geometry column of `geometry_type`.
    pub fn geometry(mut self, geometry_type: impl Into<String>) -> Self {
        self.geometry = Some(geometry_type.into());
        self
    }

    /// Validates an untyped description in full before anything is built.
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::Validation`] with the first violation found.
    pub fn from_value(spec: &Value) -> Result<Self> {
        reject(validate_table_structure(spec))?;
        let raw_columns = spec
            .get("columns")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for raw in raw_columns {
            reject(validate_column_structure(raw))?;
        }

        let geometry = match spec.get("geometry") {
            None | Some(Value::Null) => None,
            Some(Value::String(kind)) if !kind.trim().is_empty() => Some(kind.trim().to_string()),
            Some(_) => return Err(TerraError::validation(GEOMETRY_INVALID)),
        };

        let columns = raw_columns.iter().map(column_from_value).collect();
        let table_name = spec
            .get("tableName")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(Self {
            table_name: table_name.trim().to_string(),
            columns,
            geometry,
        })
    }

    /// Checks a typed description against the same rules as
    /// [`TableSpec::from_value`]: a non-blank table name, non-blank column
    /// names and types, and a non-blank geometry keyword when one is set.
    pub fn validate(&self) -> Validation {
        if self.table_name.trim().is_empty() {
            return Validation::invalid(TABLE_NAME_REQUIRED);
        }
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Validation::invalid(COLUMN_NAME_INVALID);
            }
            if column.ty.trim().is_empty() {
                return Validation::invalid(COLUMN_TYPE_INVALID);
            }
        }
        match self.geometry.as_deref() {
            Some(kind) if kind.trim().is_empty() => Validation::invalid(GEOMETRY_INVALID),
            _ => Validation::Valid,
        }
    }

    /// `CREATE TABLE` statement for this spec.
    ///
    /// Identifiers and clauses are emitted verbatim; callers are trusted.
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnSpec::definition).collect();
        format!("CREATE TABLE {} ({});", self.table_name, columns.join(", "))
    }
}

pub(crate) fn reject(validation: Validation) -> Result<()> {
    match validation {
        Validation::Valid => Ok(()),
        Validation::Invalid { reason } => Err(TerraError::Validation { reason }),
    }
}

// Only called on values that already passed `validate_column_structure`.
fn column_from_value(raw: &Value) -> ColumnSpec {
    let text = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let constraints = raw
        .get("constraints")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    ColumnSpec {
        name: text("name"),
        ty: text("type"),
        constraints,
    }
}
