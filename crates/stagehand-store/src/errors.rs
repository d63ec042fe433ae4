//! Error handling for stagehand-store
//!
//! Wraps stagehand-core ExError with store-specific helpers

use stagehand_core::errors::{ExError, ExErrorKind};
use stagehand_core::OperationKind;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a database error for a failed write of one entity
pub fn write_failed(err: rusqlite::Error, entity_type: &str, operation: OperationKind) -> ExError {
    from_rusqlite(err)
        .with_entity_type(entity_type)
        .with_operation(operation)
}

/// Create an error for a `Table` whose values do not line up with its columns
pub fn column_mismatch(table: &str, expected: usize, actual: usize) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("bind_columns")
        .with_message(format!(
            "Table {} declares {} columns but supplied {} values",
            table, expected, actual
        ))
}
