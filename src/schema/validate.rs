use serde_json::{Map, Value};

/// Outcome of a structural check on an untyped table or column description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The structure is acceptable.
    Valid,
    /// The structure was rejected.
    Invalid {
        /// Why it was rejected.
        reason: String,
    },
}

impl Validation {
    pub(crate) fn invalid(reason: &str) -> Self {
        Validation::Invalid {
            reason: reason.to_string(),
        }
    }

    /// True for [`Validation::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    /// Rejection reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Validation::Valid => None,
            Validation::Invalid { reason } => Some(reason),
        }
    }
}

pub(crate) const TABLE_NAME_REQUIRED: &str = "tableName cannot be empty or null";
pub(crate) const COLUMNS_NOT_ARRAY: &str = "columns must be an array of json objects";
pub(crate) const COLUMN_NOT_OBJECT: &str = "columns must be of type json";
pub(crate) const COLUMN_FIELDS_REQUIRED: &str = "column must have name and type";
pub(crate) const COLUMN_NAME_INVALID: &str = "column name must be a valid string";
pub(crate) const COLUMN_TYPE_INVALID: &str = "column type must be a valid string";
pub(crate) const CONSTRAINTS_INVALID: &str = "column constraints must be array of string(s)";
pub(crate) const GEOMETRY_INVALID: &str = "geometry must be a valid string";

/// Checks the table envelope: a non-blank `tableName` and a `columns` array
/// whose first element, if any, is an object.
pub fn validate_table_structure(spec: &Value) -> Validation {
    let Some(obj) = spec.as_object() else {
        return Validation::invalid(TABLE_NAME_REQUIRED);
    };
    match obj.get("tableName").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => {}
        _ => return Validation::invalid(TABLE_NAME_REQUIRED),
    }
    let Some(columns) = obj.get("columns").and_then(Value::as_array) else {
        return Validation::invalid(COLUMNS_NOT_ARRAY);
    };
    if let Some(first) = columns.first() {
        if !first.is_object() {
            return Validation::invalid(COLUMN_NOT_OBJECT);
        }
    }
    Validation::Valid
}

/// Checks one column: string `name` and `type`, and `constraints`, when
/// present, an array of strings.
pub fn validate_column_structure(column: &Value) -> Validation {
    let Some(obj) = column.as_object() else {
        return Validation::invalid(COLUMN_NOT_OBJECT);
    };
    validate_column_object(obj)
}

fn validate_column_object(obj: &Map<String, Value>) -> Validation {
    let (Some(name), Some(ty)) = (obj.get("name"), obj.get("type")) else {
        return Validation::invalid(COLUMN_FIELDS_REQUIRED);
    };
    if !is_non_blank_str(name) {
        return Validation::invalid(COLUMN_NAME_INVALID);
    }
    if !is_non_blank_str(ty) {
        return Validation::invalid(COLUMN_TYPE_INVALID);
    }
    if let Some(constraints) = obj.get("constraints") {
        let all_strings = constraints
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string));
        if !all_strings {
            return Validation::invalid(CONSTRAINTS_INVALID);
        }
    }
    Validation::Valid
}

fn is_non_blank_str(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}
