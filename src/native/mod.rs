//! Native statement interface
//!
//! The statement lifecycle drives the client library only through these
//! traits. They mirror the `mysql_stmt_*` calls one to one: a call reports
//! plain success or failure and the diagnostic detail stays on the handle,
//! readable through `errno`, `error` and `sqlstate`.
//!
//! Two implementations ship with the crate: [`ffi`] over libmysqlclient
//! (feature `libmysqlclient`) and [`memory`], an in-process engine.

use crate::api::BindSlot;
use crate::types::StmtAttr;

#[cfg(feature = "libmysqlclient")]
pub mod ffi;
pub mod memory;

/// `(my_ulonglong)-1`, returned by affected-rows on error
pub const AFFECTED_ROWS_ERROR: u64 = u64::MAX;

/// An open connection able to create statement handles (`mysql_stmt_init`)
pub trait NativeConnection {
    type Statement: NativeStatement;

    /// New statement handle, or `None` when the client library is out of memory
    fn stmt_init(&mut self) -> Option<Self::Statement>;
}

/// A native prepared-statement handle.
///
/// Methods returning `bool` return `true` on success.
pub trait NativeStatement {
    /// Result metadata handle handed over to the result collaborator
    type Metadata;

    fn prepare(&mut self, query: &str) -> bool;

    fn param_count(&self) -> u64;

    /// Register parameter descriptors pointing into `params`.
    ///
    /// Returns `false` without registering anything when `params.len()`
    /// differs from [`param_count`](Self::param_count).
    ///
    /// # Safety
    /// The client library keeps pointers into `params` after the call
    /// returns and reads them on `execute`. The slots must stay alive and in
    /// place whenever `execute` is called, until the next successful
    /// `bind_param`, `prepare` or `close`. Slots released earlier leave the
    /// handle unusable for `execute` until it is bound again.
    unsafe fn bind_param(&mut self, params: &mut [BindSlot]) -> bool;

    fn execute(&mut self) -> bool;

    fn store_result(&mut self) -> bool;

    fn free_result(&mut self) -> bool;

    fn reset(&mut self) -> bool;

    /// Release the handle. Consumes it: a handle is closed exactly once.
    fn close(self) -> bool;

    /// Rows changed by the last execute, or [`AFFECTED_ROWS_ERROR`]
    fn affected_rows(&self) -> u64;

    fn insert_id(&self) -> u64;

    fn field_count(&self) -> u32;

    fn num_rows(&self) -> u64;

    fn data_seek(&mut self, row: u64);

    fn errno(&self) -> u32;

    fn error(&self) -> String;

    fn sqlstate(&self) -> String;

    /// Raw attribute value, `None` when the library rejects the attribute
    fn attr_get(&self, attr: StmtAttr) -> Option<u64>;

    fn attr_set(&mut self, attr: StmtAttr, value: u64) -> bool;

    /// Metadata of the result set, `None` when the statement produces none
    fn result_metadata(&mut self) -> Option<Self::Metadata>;
}
