//! Raw libmysqlclient declarations
//!
//! Layouts follow the MySQL 8.0 `mysql.h` / `mysql_time.h` headers, where
//! `my_bool` became C `bool`. The `extern "C"` block is only compiled with the
//! `libmysqlclient` feature; the types are always available because the bind
//! slots produce `MYSQL_TIME` values regardless of the backend.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(dead_code)]

#[cfg(feature = "libmysqlclient")]
use libc::c_char;
use libc::{c_int, c_uint, c_ulong, c_void};

pub type my_bool = bool;
pub type my_ulonglong = u64;

/// `enum enum_field_types` (subset used for parameters)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum enum_field_types {
    MYSQL_TYPE_DECIMAL = 0,
    MYSQL_TYPE_TINY = 1,
    MYSQL_TYPE_SHORT = 2,
    MYSQL_TYPE_LONG = 3,
    MYSQL_TYPE_FLOAT = 4,
    MYSQL_TYPE_DOUBLE = 5,
    MYSQL_TYPE_NULL = 6,
    MYSQL_TYPE_TIMESTAMP = 7,
    MYSQL_TYPE_LONGLONG = 8,
    MYSQL_TYPE_INT24 = 9,
    MYSQL_TYPE_DATE = 10,
    MYSQL_TYPE_TIME = 11,
    MYSQL_TYPE_DATETIME = 12,
    MYSQL_TYPE_YEAR = 13,
    MYSQL_TYPE_NEWDATE = 14,
    MYSQL_TYPE_VARCHAR = 15,
    MYSQL_TYPE_BIT = 16,
    MYSQL_TYPE_BLOB = 252,
    MYSQL_TYPE_VAR_STRING = 253,
    MYSQL_TYPE_STRING = 254,
}

/// `enum enum_mysql_timestamp_type`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum enum_mysql_timestamp_type {
    MYSQL_TIMESTAMP_NONE = -2,
    MYSQL_TIMESTAMP_ERROR = -1,
    MYSQL_TIMESTAMP_DATE = 0,
    MYSQL_TIMESTAMP_DATETIME = 1,
    MYSQL_TIMESTAMP_TIME = 2,
}

/// `enum enum_stmt_attr_type`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum enum_stmt_attr_type {
    STMT_ATTR_UPDATE_MAX_LENGTH = 0,
    STMT_ATTR_CURSOR_TYPE = 1,
    STMT_ATTR_PREFETCH_ROWS = 2,
}

/// `MYSQL_TIME`: broken-down calendar time exchanged with the server.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MYSQL_TIME {
    pub year: c_uint,
    pub month: c_uint,
    pub day: c_uint,
    pub hour: c_uint,
    pub minute: c_uint,
    pub second: c_uint,
    /// microseconds
    pub second_part: c_ulong,
    pub neg: my_bool,
    pub time_type: enum_mysql_timestamp_type,
    pub time_zone_displacement: c_int,
}

impl Default for MYSQL_TIME {
    fn default() -> Self {
        Self {
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            second_part: 0,
            neg: false,
            time_type: enum_mysql_timestamp_type::MYSQL_TIMESTAMP_NONE,
            time_zone_displacement: 0,
        }
    }
}

/// `MYSQL_BIND`: one parameter descriptor.
///
/// The client library copies the descriptor array on `mysql_stmt_bind_param`
/// but keeps `buffer`, `length` and `is_null` pointers until the next bind,
/// so whatever they point at must outlive the binding.
#[repr(C)]
pub struct MYSQL_BIND {
    pub length: *mut c_ulong,
    pub is_null: *mut my_bool,
    pub buffer: *mut c_void,
    pub error: *mut my_bool,
    pub row_ptr: *mut u8,
    pub store_param_func: *mut c_void,
    pub fetch_result: *mut c_void,
    pub skip_result: *mut c_void,
    pub buffer_length: c_ulong,
    pub offset: c_ulong,
    pub length_value: c_ulong,
    pub param_number: c_uint,
    pub pack_length: c_uint,
    pub buffer_type: enum_field_types,
    pub error_value: my_bool,
    pub is_unsigned: my_bool,
    pub long_data_used: my_bool,
    pub is_null_value: my_bool,
    pub extension: *mut c_void,
}

impl MYSQL_BIND {
    /// All-zero descriptor, the equivalent of `memset(&bind, 0, sizeof bind)`.
    pub fn zeroed() -> Self {
        Self {
            length: std::ptr::null_mut(),
            is_null: std::ptr::null_mut(),
            buffer: std::ptr::null_mut(),
            error: std::ptr::null_mut(),
            row_ptr: std::ptr::null_mut(),
            store_param_func: std::ptr::null_mut(),
            fetch_result: std::ptr::null_mut(),
            skip_result: std::ptr::null_mut(),
            buffer_length: 0,
            offset: 0,
            length_value: 0,
            param_number: 0,
            pack_length: 0,
            buffer_type: enum_field_types::MYSQL_TYPE_DECIMAL,
            error_value: false,
            is_unsigned: false,
            long_data_used: false,
            is_null_value: false,
            extension: std::ptr::null_mut(),
        }
    }
}

#[repr(C)]
pub struct MYSQL {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MYSQL_STMT {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MYSQL_RES {
    _private: [u8; 0],
}

#[cfg(feature = "libmysqlclient")]
extern "C" {
    pub fn mysql_stmt_init(mysql: *mut MYSQL) -> *mut MYSQL_STMT;
    pub fn mysql_stmt_prepare(stmt: *mut MYSQL_STMT, query: *const c_char, length: c_ulong) -> c_int;
    pub fn mysql_stmt_param_count(stmt: *mut MYSQL_STMT) -> c_ulong;
    pub fn mysql_stmt_bind_param(stmt: *mut MYSQL_STMT, bnd: *mut MYSQL_BIND) -> my_bool;
    pub fn mysql_stmt_execute(stmt: *mut MYSQL_STMT) -> c_int;
    pub fn mysql_stmt_store_result(stmt: *mut MYSQL_STMT) -> c_int;
    pub fn mysql_stmt_free_result(stmt: *mut MYSQL_STMT) -> my_bool;
    pub fn mysql_stmt_reset(stmt: *mut MYSQL_STMT) -> my_bool;
    pub fn mysql_stmt_close(stmt: *mut MYSQL_STMT) -> my_bool;
    pub fn mysql_stmt_affected_rows(stmt: *mut MYSQL_STMT) -> my_ulonglong;
    pub fn mysql_stmt_insert_id(stmt: *mut MYSQL_STMT) -> my_ulonglong;
    pub fn mysql_stmt_field_count(stmt: *mut MYSQL_STMT) -> c_uint;
    pub fn mysql_stmt_num_rows(stmt: *mut MYSQL_STMT) -> my_ulonglong;
    pub fn mysql_stmt_data_seek(stmt: *mut MYSQL_STMT, offset: my_ulonglong);
    pub fn mysql_stmt_errno(stmt: *mut MYSQL_STMT) -> c_uint;
    pub fn mysql_stmt_error(stmt: *mut MYSQL_STMT) -> *const c_char;
    pub fn mysql_stmt_sqlstate(stmt: *mut MYSQL_STMT) -> *const c_char;
    pub fn mysql_stmt_attr_get(
        stmt: *mut MYSQL_STMT,
        attr_type: enum_stmt_attr_type,
        attr: *mut c_void,
    ) -> my_bool;
    pub fn mysql_stmt_attr_set(
        stmt: *mut MYSQL_STMT,
        attr_type: enum_stmt_attr_type,
        attr: *const c_void,
    ) -> my_bool;
    pub fn mysql_stmt_result_metadata(stmt: *mut MYSQL_STMT) -> *mut MYSQL_RES;
    pub fn mysql_free_result(result: *mut MYSQL_RES);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    #[cfg(all(target_pointer_width = "64", not(windows)))]
    fn test_bind_layout() {
        assert_eq!(size_of::<MYSQL_BIND>(), 112);
        assert_eq!(offset_of!(MYSQL_BIND, buffer), 16);
        assert_eq!(offset_of!(MYSQL_BIND, buffer_length), 64);
        assert_eq!(offset_of!(MYSQL_BIND, param_number), 88);
        assert_eq!(offset_of!(MYSQL_BIND, buffer_type), 96);
        assert_eq!(offset_of!(MYSQL_BIND, is_unsigned), 101);
        assert_eq!(offset_of!(MYSQL_BIND, is_null_value), 103);
        assert_eq!(offset_of!(MYSQL_BIND, extension), 104);
    }

    #[test]
    #[cfg(all(target_pointer_width = "64", not(windows)))]
    fn test_time_layout() {
        assert_eq!(size_of::<MYSQL_TIME>(), 48);
        assert_eq!(offset_of!(MYSQL_TIME, second_part), 24);
        assert_eq!(offset_of!(MYSQL_TIME, neg), 32);
        assert_eq!(offset_of!(MYSQL_TIME, time_type), 36);
        assert_eq!(offset_of!(MYSQL_TIME, time_zone_displacement), 40);
    }

    #[test]
    fn test_enum_widths() {
        assert_eq!(size_of::<enum_field_types>(), size_of::<c_int>());
        assert_eq!(size_of::<enum_mysql_timestamp_type>(), size_of::<c_int>());
        assert_eq!(enum_field_types::MYSQL_TYPE_STRING as c_int, 254);
        assert_eq!(enum_mysql_timestamp_type::MYSQL_TIMESTAMP_NONE as c_int, -2);
    }
}
