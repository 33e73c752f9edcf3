//! Prepared statement handling
//!
//! This module implements the statement object exposed to the host: an owning
//! wrapper around one native statement handle, the bind buffers registered
//! with it, and the lifecycle guards checked before every native call.

use crate::error::{Error, Result};
use crate::native::{NativeConnection, NativeStatement, AFFECTED_ROWS_ERROR};
use crate::types::{AttrValue, HostValue, StmtAttr, StmtFlags, StmtState};

use super::bind::{bind_values, BindSlot, ParamBuffers};
use super::config::StatementConfig;

// ============================================================================
// Statement
// ============================================================================

/// Result metadata handed to the result collaborator
#[derive(Debug)]
pub struct ResultMetadata<M> {
    /// Native metadata handle; the receiver owns it from now on
    pub handle: M,
    /// Columns in the result set
    pub field_count: u32,
}

/// Prepared statement bound to one native handle.
///
/// Operational failures of the server (rejected query, failed execute, failed
/// store) come back as `Ok(false)`; `errno()`, `error()` and `sql_state()`
/// then describe them. Calls made in the wrong state fail with an [`Error`].
pub struct Statement<S: NativeStatement> {
    /// Native handle, `None` once closed
    handle: Option<S>,
    /// Declared parameters of the prepared query
    param_count: u64,
    /// Bind slots, always `param_count` long
    params: ParamBuffers,
    flags: StmtFlags,
    /// Last successfully prepared query text
    query: Option<String>,
}

impl<S: NativeStatement> Statement<S> {
    /// Create a statement on `conn` (mysql_stmt_init)
    pub fn init<C>(conn: &mut C) -> Result<Self>
    where
        C: NativeConnection<Statement = S>,
    {
        Self::init_with(conn, &StatementConfig::default())
    }

    /// Create a statement on `conn` and apply the attribute overrides of `config`
    pub fn init_with<C>(conn: &mut C, config: &StatementConfig) -> Result<Self>
    where
        C: NativeConnection<Statement = S>,
    {
        let handle = conn.stmt_init().ok_or(Error::OutOfMemory)?;
        let mut stmt = Self::from_handle(handle);
        for (attr, value) in config.attributes() {
            stmt.attr_set(attr, value)?;
        }
        Ok(stmt)
    }

    /// Take ownership of an already created native handle
    pub fn from_handle(handle: S) -> Self {
        Self {
            handle: Some(handle),
            param_count: 0,
            params: ParamBuffers::empty(),
            flags: StmtFlags::empty(),
            query: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> StmtState {
        if self.handle.is_none() {
            StmtState::Uninitialized
        } else if self.flags.contains(StmtFlags::STORED) {
            StmtState::Stored
        } else if self.flags.contains(StmtFlags::EXECUTED) {
            StmtState::Executed
        } else if self.flags.contains(StmtFlags::BOUND) {
            StmtState::Bound
        } else if self.flags.contains(StmtFlags::PREPARED) {
            StmtState::Prepared
        } else {
            StmtState::Initialized
        }
    }

    /// Check if a query is prepared
    pub fn is_prepared(&self) -> bool {
        self.flags.contains(StmtFlags::PREPARED)
    }

    /// Check if the current slots are registered with the native handle
    pub fn has_bound_params(&self) -> bool {
        self.flags.contains(StmtFlags::BOUND)
    }

    /// Check if a result is buffered client-side
    pub fn is_stored(&self) -> bool {
        self.flags.contains(StmtFlags::STORED)
    }

    /// Last successfully prepared query
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Current bind slots
    pub fn params(&self) -> &[BindSlot] {
        self.params.as_slice()
    }

    /// Native handle, for collaborators that read rows.
    ///
    /// Only shared access is lent out: every call that changes the handle
    /// goes through the statement so its slots and flags stay in step.
    ///
    /// ```compile_fail
    /// use mysql_bindings::native::memory::MemoryConnection;
    /// use mysql_bindings::{NativeStatement, Statement};
    ///
    /// let mut conn = MemoryConnection::new();
    /// let mut stmt = Statement::init(&mut conn).unwrap();
    /// stmt.prepare("SELECT ?").unwrap();
    /// stmt.handle().unwrap().prepare("SELECT ?, ?, ?");
    /// ```
    pub fn handle(&self) -> Option<&S> {
        self.handle.as_ref()
    }

    // ------------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------------

    fn live(&self) -> Result<&S> {
        self.handle.as_ref().ok_or(Error::NotInitialized)
    }

    fn live_mut(&mut self) -> Result<&mut S> {
        self.handle.as_mut().ok_or(Error::NotInitialized)
    }

    fn prepared(&self) -> Result<&S> {
        let handle = self.live()?;
        if !self.flags.contains(StmtFlags::PREPARED) {
            return Err(Error::NotPrepared);
        }
        Ok(handle)
    }

    fn prepared_mut(&mut self) -> Result<&mut S> {
        if self.handle.is_some() && !self.flags.contains(StmtFlags::PREPARED) {
            return Err(Error::NotPrepared);
        }
        self.live_mut()
    }

    fn stored(&self) -> Result<&S> {
        let handle = self.prepared()?;
        if !self.flags.contains(StmtFlags::STORED) {
            return Err(Error::NotStored);
        }
        Ok(handle)
    }

    /// Drop bind slots and everything learned from the last prepare
    fn release(&mut self) {
        self.params = ParamBuffers::empty();
        self.param_count = 0;
        self.flags = StmtFlags::empty();
        self.query = None;
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Compile `query` (mysql_stmt_prepare).
    ///
    /// Previous bind slots are released first, whatever the outcome. Returns
    /// `Ok(false)` when the server rejects the query; the statement is then
    /// left unprepared.
    pub fn prepare(&mut self, query: &str) -> Result<bool> {
        self.live()?;
        self.release();

        let handle = self.live_mut()?;
        if !handle.prepare(query) {
            log::warn!(
                "prepare failed ({}): {}",
                handle.errno(),
                handle.error()
            );
            return Ok(false);
        }
        let param_count = handle.param_count();

        self.params = ParamBuffers::zeroed(param_count)?;
        self.param_count = param_count;
        self.flags = StmtFlags::PREPARED;
        self.query = Some(query.to_string());
        log::debug!("prepared statement with {} parameters: {}", param_count, query);
        Ok(true)
    }

    /// Convert `values` and register them as the statement parameters
    /// (mysql_stmt_bind_param).
    ///
    /// The value count must match the prepared parameter count. On a
    /// conversion error nothing is registered. When registration itself
    /// fails, the new slots stay with the statement until the next bind,
    /// reset, prepare or close.
    pub fn bind_parameters(&mut self, values: &[HostValue]) -> Result<()> {
        self.prepared()?;
        let buffers = bind_values(self.param_count, values)?;

        self.params = buffers;
        self.flags.remove(StmtFlags::BOUND);

        let handle = self.handle.as_mut().ok_or(Error::NotInitialized)?;
        // SAFETY: the slots live in `self.params` until the next bind, reset,
        // prepare or close. Reset and a failed bind clear BOUND, and execute
        // refuses to run without it.
        if !unsafe { handle.bind_param(self.params.as_mut_slice()) } {
            let message = handle.error();
            log::warn!("bind failed ({}): {}", handle.errno(), message);
            return Err(Error::BindRegistrationFailed { message });
        }

        self.flags.insert(StmtFlags::BOUND);
        log::debug!("bound {} parameters", self.params.len());
        Ok(())
    }

    /// Run the prepared statement (mysql_stmt_execute).
    ///
    /// Returns `Ok(false)` when the server reports a failure.
    pub fn execute(&mut self) -> Result<bool> {
        self.prepared()?;
        if self.param_count > 0 && !self.flags.contains(StmtFlags::BOUND) {
            return Err(Error::ParametersNotBound {
                param_count: self.param_count,
            });
        }

        let handle = self.live_mut()?;
        let ok = handle.execute();
        if !ok {
            log::warn!("execute failed ({}): {}", handle.errno(), handle.error());
            self.flags.remove(StmtFlags::EXECUTED | StmtFlags::STORED);
            return Ok(false);
        }

        self.flags.insert(StmtFlags::EXECUTED);
        self.flags.remove(StmtFlags::STORED);
        Ok(true)
    }

    /// Buffer the whole result client-side (mysql_stmt_store_result)
    pub fn store_result(&mut self) -> Result<bool> {
        self.prepared()?;
        if !self.flags.contains(StmtFlags::EXECUTED) {
            return Err(Error::NotExecuted);
        }

        let handle = self.live_mut()?;
        if !handle.store_result() {
            log::warn!("store result failed ({}): {}", handle.errno(), handle.error());
            return Ok(false);
        }

        self.flags.insert(StmtFlags::STORED);
        Ok(true)
    }

    /// Release the buffered or pending result (mysql_stmt_free_result)
    pub fn free_result(&mut self) -> Result<bool> {
        let ok = self.live_mut()?.free_result();
        if ok {
            self.flags.remove(StmtFlags::STORED);
        }
        Ok(ok)
    }

    /// Return to the prepared state (mysql_stmt_reset).
    ///
    /// The query and its parameter count are kept; bound values and any
    /// result are dropped, so parameters must be bound again before the next
    /// execute.
    pub fn reset(&mut self) -> Result<()> {
        let handle = self.prepared_mut()?;
        if !handle.reset() {
            let message = handle.error();
            return Err(Error::ResetFailed { message });
        }

        self.params = ParamBuffers::zeroed(self.param_count)?;
        self.flags = StmtFlags::PREPARED;
        log::debug!("statement reset");
        Ok(())
    }

    /// Release the native handle and every bind buffer (mysql_stmt_close).
    ///
    /// A failing native close is reported once; the handle is gone either
    /// way. Closing twice is an error.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(Error::AlreadyClosed)?;
        let closed = handle.close();
        self.release();

        if !closed {
            log::warn!("mysql_stmt_close reported an error");
            return Err(Error::CloseFailed);
        }
        log::debug!("statement closed");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Rows changed by the last execute, or buffered by the last store
    pub fn affected_rows(&self) -> Result<u64> {
        let rows = self.prepared()?.affected_rows();
        if rows == AFFECTED_ROWS_ERROR {
            return Err(Error::AffectedRowsUnavailable);
        }
        Ok(rows)
    }

    /// Columns in the result set, 0 for statements without one
    pub fn field_count(&self) -> Result<u32> {
        Ok(self.prepared()?.field_count())
    }

    /// Value generated for an AUTO_INCREMENT column by the last execute
    pub fn last_insert_id(&self) -> Result<u64> {
        Ok(self.prepared()?.insert_id())
    }

    /// Placeholders in the prepared query
    pub fn param_count(&self) -> Result<u64> {
        self.prepared()?;
        Ok(self.param_count)
    }

    /// Rows in the stored result
    pub fn num_rows(&self) -> Result<u64> {
        Ok(self.stored()?.num_rows())
    }

    /// Move the row cursor of the stored result (mysql_stmt_data_seek)
    pub fn data_seek(&mut self, row: u64) -> Result<()> {
        let num_rows = self.stored()?.num_rows();
        if row >= num_rows {
            return Err(Error::InvalidRowOffset { row, num_rows });
        }
        self.live_mut()?.data_seek(row);
        Ok(())
    }

    /// Error code of the last native call, 0 on success
    pub fn errno(&self) -> Result<u32> {
        Ok(self.live()?.errno())
    }

    /// Error message of the last native call
    pub fn error(&self) -> Result<String> {
        Ok(self.live()?.error())
    }

    /// SQLSTATE of the last native call, "00000" on success
    pub fn sql_state(&self) -> Result<String> {
        Ok(self.live()?.sqlstate())
    }

    /// Read a statement attribute (mysql_stmt_attr_get)
    pub fn attr_get(&self, attr: StmtAttr) -> Result<AttrValue> {
        let raw = self.live()?.attr_get(attr).ok_or(Error::UnsupportedAttribute)?;
        match attr {
            StmtAttr::UpdateMaxLength => Ok(AttrValue::Bool(raw != 0)),
            StmtAttr::CursorType | StmtAttr::PrefetchRows => u32::try_from(raw)
                .map(AttrValue::Unsigned)
                .map_err(|_| Error::UnsupportedAttribute),
        }
    }

    /// Set a statement attribute (mysql_stmt_attr_set).
    ///
    /// `UpdateMaxLength` takes a boolean, the others an unsigned integer.
    pub fn attr_set(&mut self, attr: StmtAttr, value: AttrValue) -> Result<()> {
        let raw = match (attr, value) {
            (StmtAttr::UpdateMaxLength, AttrValue::Bool(v)) => v as u64,
            (StmtAttr::UpdateMaxLength, _) => {
                return Err(Error::InvalidAttributeValue {
                    attr: attr.name(),
                    expected: "boolean",
                })
            }
            (_, AttrValue::Unsigned(v)) => v as u64,
            (_, AttrValue::Bool(_)) => {
                return Err(Error::InvalidAttributeValue {
                    attr: attr.name(),
                    expected: "unsigned integer",
                })
            }
        };

        if !self.live_mut()?.attr_set(attr, raw) {
            return Err(Error::UnsupportedAttribute);
        }
        Ok(())
    }

    /// Metadata of the result set, `None` when the statement produces none
    /// (mysql_stmt_result_metadata)
    pub fn result_metadata(&mut self) -> Result<Option<ResultMetadata<S::Metadata>>> {
        let handle = self.prepared_mut()?;
        let Some(metadata) = handle.result_metadata() else {
            return Ok(None);
        };
        Ok(Some(ResultMetadata {
            handle: metadata,
            field_count: handle.field_count(),
        }))
    }
}

impl<S: NativeStatement> Drop for Statement<S> {
    fn drop(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        if !handle.free_result() {
            log::warn!("mysql_stmt_free_result failed while dropping statement");
        }
        if !handle.close() {
            log::warn!("mysql_stmt_close failed while dropping statement");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
