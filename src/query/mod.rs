//! Typed statement execution.
//!
//! Reads step to exhaustion and type every cell through [`TypedCell`];
//! updates step once and hand back the first column as text; bulk statements
//! step to completion and report the number of changed rows.

mod cell;
mod executor;

/// Typed result cells.
pub use cell::TypedCell;

/// Statement runners and their result shapes.
pub use executor::{
    execute_bulk, execute_query, execute_update, BulkOutcome, ResultSet, RowView, UpdateOutcome,
};
