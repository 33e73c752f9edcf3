//! mysql-bindings - prepared statements over the libmysqlclient C API
//!
//! Converts dynamically-typed host values into native parameter bindings and
//! drives the statement lifecycle: prepare, bind, execute, store, reset and
//! close.

pub mod api;
pub mod error;
pub mod mem;
pub mod native;
pub mod sys;
pub mod types;

// Re-export main public types
pub use error::{Error, Result};

pub use api::{
    bind_values, BindSlot, ParamBuffers, ResultMetadata, Statement, StatementConfig,
};
pub use mem::bind_buffer_status;
pub use native::{NativeConnection, NativeStatement};
pub use types::{AttrValue, CursorType, HostValue, StmtAttr, StmtState};
