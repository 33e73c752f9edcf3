//! Error types and Result aliases for mysql-bindings
//!
//! Every variant here is a hard failure: a precondition the caller broke or a
//! resource that could not be obtained or released. Operational failures
//! reported by the server (rejected query, constraint violation on execute,
//! store failure) are not errors at this level; those operations return
//! `Ok(false)` and the caller inspects `errno()` / `error()` / `sql_state()`.

use thiserror::Error;

/// Hard failures raised by statement operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The native statement handle is absent (never created or already released)
    #[error("Statement not initialized")]
    NotInitialized,

    /// Operation needs a successfully prepared query
    #[error("Statement not prepared")]
    NotPrepared,

    /// Operation needs a successful execute since the last prepare/reset
    #[error("Statement not executed")]
    NotExecuted,

    /// Operation needs a client-side stored result
    #[error("Statement result not stored")]
    NotStored,

    /// Execute attempted while declared parameters have no bound values
    #[error("Statement has {param_count} parameters but none are bound")]
    ParametersNotBound { param_count: u64 },

    /// Second close on the same statement
    #[error("Statement already closed")]
    AlreadyClosed,

    /// Supplied value count differs from the prepared parameter count
    #[error("Parameter count mismatch: statement expects {expected}, got {actual}")]
    ParameterCountMismatch { expected: u64, actual: usize },

    /// Host value of a category that has no native binding
    #[error("Unsupported parameter type '{type_name}' at index {index}")]
    UnsupportedParameterType { index: usize, type_name: &'static str },

    /// Date instant could not be decomposed into UTC calendar fields
    #[error("Cannot convert date parameter at index {index} to a UTC calendar time")]
    DateConversionError { index: usize },

    /// Native mysql_stmt_bind_param() rejected the descriptors
    #[error("Cannot bind parameters: {message}")]
    BindRegistrationFailed { message: String },

    /// Allocation of statement or bind-slot storage failed
    #[error("Out of memory")]
    OutOfMemory,

    /// Native mysql_stmt_reset() failed
    #[error("Error in mysql_stmt_reset: {message}")]
    ResetFailed { message: String },

    /// Native mysql_stmt_close() failed; the handle is released regardless
    #[error("Error in mysql_stmt_close")]
    CloseFailed,

    /// Native mysql_stmt_affected_rows() returned (my_ulonglong)-1
    #[error("Error occured in mysql_stmt_affected_rows(), -1 returned")]
    AffectedRowsUnavailable,

    /// Row offset outside the stored result
    #[error("Invalid row offset {row} (result has {num_rows} rows)")]
    InvalidRowOffset { row: u64, num_rows: u64 },

    /// Attribute rejected by the client library
    #[error("This attribute isn't supported by libmysqlclient")]
    UnsupportedAttribute,

    /// Attribute value of the wrong kind for the attribute
    #[error("Attribute {attr} expects a {expected} value")]
    InvalidAttributeValue {
        attr: &'static str,
        expected: &'static str,
    },
}

/// Result type alias for mysql-bindings operations
pub type Result<T> = std::result::Result<T, Error>;
