//! libmysqlclient statement handles

#![allow(unsafe_code)]

use std::ffi::CStr;
use std::ptr::NonNull;

use libc::{c_char, c_ulong, c_void};

use super::{NativeConnection, NativeStatement};
use crate::api::BindSlot;
use crate::sys::{self as ffi, enum_stmt_attr_type, MYSQL_BIND};
use crate::types::StmtAttr;

fn attr_type(attr: StmtAttr) -> enum_stmt_attr_type {
    match attr {
        StmtAttr::UpdateMaxLength => enum_stmt_attr_type::STMT_ATTR_UPDATE_MAX_LENGTH,
        StmtAttr::CursorType => enum_stmt_attr_type::STMT_ATTR_CURSOR_TYPE,
        StmtAttr::PrefetchRows => enum_stmt_attr_type::STMT_ATTR_PREFETCH_ROWS,
    }
}

unsafe fn lossy(p: *const c_char) -> String {
    if p.is_null() {
        return String::new();
    }
    CStr::from_ptr(p).to_string_lossy().into_owned()
}

// -------------------------- Connection --------------------------

/// Borrowed `MYSQL*` owned by the connection collaborator
pub struct LibMysqlConnection {
    raw: NonNull<ffi::MYSQL>,
}

impl LibMysqlConnection {
    /// # Safety
    /// `raw` must be an open connection that outlives every statement created from it.
    pub unsafe fn from_raw(raw: *mut ffi::MYSQL) -> Option<Self> {
        NonNull::new(raw).map(|raw| Self { raw })
    }
}

impl NativeConnection for LibMysqlConnection {
    type Statement = LibMysqlStatement;

    fn stmt_init(&mut self) -> Option<LibMysqlStatement> {
        let raw = unsafe { ffi::mysql_stmt_init(self.raw.as_ptr()) };
        NonNull::new(raw).map(|raw| LibMysqlStatement { raw })
    }
}

// -------------------------- Statement --------------------------

/// Owned `MYSQL_STMT*`
pub struct LibMysqlStatement {
    raw: NonNull<ffi::MYSQL_STMT>,
}

impl LibMysqlStatement {
    fn ptr(&self) -> *mut ffi::MYSQL_STMT {
        self.raw.as_ptr()
    }
}

impl NativeStatement for LibMysqlStatement {
    type Metadata = LibMysqlResult;

    fn prepare(&mut self, query: &str) -> bool {
        let rc = unsafe {
            ffi::mysql_stmt_prepare(
                self.ptr(),
                query.as_ptr() as *const c_char,
                query.len() as c_ulong,
            )
        };
        rc == 0
    }

    fn param_count(&self) -> u64 {
        unsafe { ffi::mysql_stmt_param_count(self.ptr()) as u64 }
    }

    unsafe fn bind_param(&mut self, params: &mut [BindSlot]) -> bool {
        // mysql_stmt_bind_param reads param_count descriptors unconditionally
        if params.len() as u64 != self.param_count() {
            return false;
        }
        // The library copies the descriptor array; only the buffers must live on.
        let mut binds: Vec<MYSQL_BIND> = params.iter_mut().map(BindSlot::to_bind).collect();
        let failed = ffi::mysql_stmt_bind_param(self.ptr(), binds.as_mut_ptr());
        !failed
    }

    fn execute(&mut self) -> bool {
        unsafe { ffi::mysql_stmt_execute(self.ptr()) == 0 }
    }

    fn store_result(&mut self) -> bool {
        unsafe { ffi::mysql_stmt_store_result(self.ptr()) == 0 }
    }

    fn free_result(&mut self) -> bool {
        unsafe { !ffi::mysql_stmt_free_result(self.ptr()) }
    }

    fn reset(&mut self) -> bool {
        unsafe { !ffi::mysql_stmt_reset(self.ptr()) }
    }

    fn close(self) -> bool {
        unsafe { !ffi::mysql_stmt_close(self.ptr()) }
    }

    fn affected_rows(&self) -> u64 {
        unsafe { ffi::mysql_stmt_affected_rows(self.ptr()) }
    }

    fn insert_id(&self) -> u64 {
        unsafe { ffi::mysql_stmt_insert_id(self.ptr()) }
    }

    fn field_count(&self) -> u32 {
        unsafe { ffi::mysql_stmt_field_count(self.ptr()) }
    }

    fn num_rows(&self) -> u64 {
        unsafe { ffi::mysql_stmt_num_rows(self.ptr()) }
    }

    fn data_seek(&mut self, row: u64) {
        unsafe { ffi::mysql_stmt_data_seek(self.ptr(), row) }
    }

    fn errno(&self) -> u32 {
        unsafe { ffi::mysql_stmt_errno(self.ptr()) }
    }

    fn error(&self) -> String {
        unsafe { lossy(ffi::mysql_stmt_error(self.ptr())) }
    }

    fn sqlstate(&self) -> String {
        unsafe { lossy(ffi::mysql_stmt_sqlstate(self.ptr())) }
    }

    fn attr_get(&self, attr: StmtAttr) -> Option<u64> {
        // UPDATE_MAX_LENGTH is read back as a bool, the others as unsigned long
        let failed;
        let value = match attr {
            StmtAttr::UpdateMaxLength => {
                let mut flag = false;
                failed = unsafe {
                    ffi::mysql_stmt_attr_get(
                        self.ptr(),
                        attr_type(attr),
                        &mut flag as *mut bool as *mut c_void,
                    )
                };
                flag as u64
            }
            StmtAttr::CursorType | StmtAttr::PrefetchRows => {
                let mut value: c_ulong = 0;
                failed = unsafe {
                    ffi::mysql_stmt_attr_get(
                        self.ptr(),
                        attr_type(attr),
                        &mut value as *mut c_ulong as *mut c_void,
                    )
                };
                value as u64
            }
        };
        (!failed).then_some(value)
    }

    fn attr_set(&mut self, attr: StmtAttr, value: u64) -> bool {
        let failed = match attr {
            StmtAttr::UpdateMaxLength => {
                let flag = value != 0;
                unsafe {
                    ffi::mysql_stmt_attr_set(
                        self.ptr(),
                        attr_type(attr),
                        &flag as *const bool as *const c_void,
                    )
                }
            }
            StmtAttr::CursorType | StmtAttr::PrefetchRows => {
                let value = value as c_ulong;
                unsafe {
                    ffi::mysql_stmt_attr_set(
                        self.ptr(),
                        attr_type(attr),
                        &value as *const c_ulong as *const c_void,
                    )
                }
            }
        };
        !failed
    }

    fn result_metadata(&mut self) -> Option<LibMysqlResult> {
        let raw = unsafe { ffi::mysql_stmt_result_metadata(self.ptr()) };
        NonNull::new(raw).map(|raw| LibMysqlResult { raw })
    }
}

// -------------------------- Result metadata --------------------------

/// Owned `MYSQL_RES*` returned by `mysql_stmt_result_metadata`
pub struct LibMysqlResult {
    raw: NonNull<ffi::MYSQL_RES>,
}

impl LibMysqlResult {
    /// Hand the raw pointer over; the caller becomes responsible for `mysql_free_result`.
    pub fn into_raw(self) -> *mut ffi::MYSQL_RES {
        let raw = self.raw.as_ptr();
        std::mem::forget(self);
        raw
    }
}

impl Drop for LibMysqlResult {
    fn drop(&mut self) {
        unsafe { ffi::mysql_free_result(self.raw.as_ptr()) };
    }
}
