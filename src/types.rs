//! Core types shared by the binder and the statement lifecycle
//!
//! This module defines the host-side dynamic value, the statement lifecycle
//! state and flags, and the statement attribute keys and values.

use bitflags::bitflags;
use chrono::{DateTime, TimeZone};

// ============================================================================
// Host Values
// ============================================================================

/// Dynamically-typed value handed over by the host runtime.
///
/// The categories mirror what a scripting runtime can tell apart about a
/// value at call time. Several overlap (an integral `Number` is also a
/// number, a `Date` is also an object), so the binder checks them in a fixed
/// order.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    /// `undefined`
    #[default]
    Undefined,
    /// Explicit `null`
    Null,
    Boolean(bool),
    /// Integer known to the host as such
    Integer(i64),
    /// Integer the host tags as unsigned 32-bit
    Unsigned(u32),
    /// IEEE 754 number, possibly integral
    Number(f64),
    Text(String),
    /// Date instant as milliseconds since the Unix epoch (UTC)
    Date(f64),
    Array(Vec<HostValue>),
    Object(Vec<(String, HostValue)>),
}

impl HostValue {
    /// Category name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::Null => "null",
            HostValue::Boolean(_) => "boolean",
            HostValue::Integer(_) | HostValue::Unsigned(_) | HostValue::Number(_) => "number",
            HostValue::Text(_) => "string",
            HostValue::Date(_) => "date",
            HostValue::Array(_) => "array",
            HostValue::Object(_) => "object",
        }
    }

    /// Whether the value is a number the host would report as a signed 32-bit integer.
    ///
    /// `-0.0` is not: the host keeps it as a double.
    pub fn as_int32(&self) -> Option<i32> {
        match *self {
            HostValue::Integer(i) => i32::try_from(i).ok(),
            HostValue::Number(f) if is_integral(f) => {
                if f >= i32::MIN as f64 && f <= i32::MAX as f64 {
                    Some(f as i32)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Whether the value is a number the host would report as an unsigned 32-bit integer.
    pub fn as_uint32(&self) -> Option<u32> {
        match *self {
            HostValue::Unsigned(u) => Some(u),
            HostValue::Integer(i) => u32::try_from(i).ok(),
            HostValue::Number(f) if is_integral(f) => {
                if f >= 0.0 && f <= u32::MAX as f64 {
                    Some(f as u32)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Any numeric value widened to a double
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            HostValue::Integer(i) => Some(i as f64),
            HostValue::Unsigned(u) => Some(u as f64),
            HostValue::Number(f) => Some(f),
            _ => None,
        }
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.trunc() == f && !(f == 0.0 && f.is_sign_negative())
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::Integer(v as i64)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::Integer(v)
    }
}

impl From<u32> for HostValue {
    fn from(v: u32) -> Self {
        HostValue::Unsigned(v)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Number(v)
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        HostValue::Boolean(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::Text(v.to_string())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::Text(v)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for HostValue {
    fn from(v: DateTime<Tz>) -> Self {
        HostValue::Date(v.timestamp_millis() as f64)
    }
}

impl<T> From<Option<T>> for HostValue
where
    T: Into<HostValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => HostValue::Null,
        }
    }
}

// ============================================================================
// Statement Lifecycle
// ============================================================================

/// Lifecycle state of a statement, derived from its handle and flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtState {
    /// Native handle absent or released
    Uninitialized,
    /// Handle present, no query prepared
    Initialized,
    /// Query compiled, bind slots allocated and zero-filled
    Prepared,
    /// Slots populated and registered
    Bound,
    /// Native execute succeeded
    Executed,
    /// Result buffered client-side
    Stored,
}

bitflags! {
    /// Statement progress flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StmtFlags: u8 {
        const PREPARED = 0x01;
        const BOUND    = 0x02;
        const EXECUTED = 0x04;
        const STORED   = 0x08;
    }
}

// ============================================================================
// Statement Attributes
// ============================================================================

/// Statement attribute keys (STMT_ATTR_*)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtAttr {
    /// STMT_ATTR_UPDATE_MAX_LENGTH: compute `MYSQL_FIELD::max_length` on store
    UpdateMaxLength,
    /// STMT_ATTR_CURSOR_TYPE
    CursorType,
    /// STMT_ATTR_PREFETCH_ROWS: rows fetched at a time with a cursor
    PrefetchRows,
}

impl StmtAttr {
    /// C name of the attribute
    pub fn name(self) -> &'static str {
        match self {
            StmtAttr::UpdateMaxLength => "STMT_ATTR_UPDATE_MAX_LENGTH",
            StmtAttr::CursorType => "STMT_ATTR_CURSOR_TYPE",
            StmtAttr::PrefetchRows => "STMT_ATTR_PREFETCH_ROWS",
        }
    }
}

/// Attribute value as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue {
    Bool(bool),
    Unsigned(u32),
}

bitflags! {
    /// Cursor types (CURSOR_TYPE_*)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CursorType: u32 {
        const NO_CURSOR  = 0;
        const READ_ONLY  = 1;
        const FOR_UPDATE = 2;
        const SCROLLABLE = 4;
    }
}
