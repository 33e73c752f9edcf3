//! Parameter binding
//!
//! Converts host values into bind slots, one per statement parameter, and
//! owns the buffers those slots hand to the client library.

use std::marker::PhantomData;
use std::mem::size_of;

use chrono::{DateTime, Datelike, Timelike, Utc};
use libc::{c_ulong, c_void};

use crate::error::{Error, Result};
use crate::mem;
use crate::sys::{enum_field_types, enum_mysql_timestamp_type, MYSQL_BIND, MYSQL_TIME};
use crate::types::HostValue;

// ============================================================================
// Bind Slot
// ============================================================================

/// One parameter binding.
///
/// Each variant owns the buffer the native descriptor points at, so the
/// buffer type and the buffer can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub enum BindSlot {
    /// MYSQL_TYPE_NULL with the null indicator set
    Null,
    /// MYSQL_TYPE_LONG
    SignedInt(i32),
    /// MYSQL_TYPE_LONG, unsigned
    UnsignedInt(u32),
    /// MYSQL_TYPE_DOUBLE
    Double(f64),
    /// MYSQL_TYPE_STRING: a private copy of the bytes and their length cell
    Text { bytes: Box<[u8]>, length: c_ulong },
    /// MYSQL_TYPE_DATETIME in UTC
    DateTime(MYSQL_TIME),
}

impl BindSlot {
    /// Convert the host value at `index` following the dispatch order:
    /// null, signed 32-bit, unsigned 32-bit, other number, text, date.
    pub fn from_host(index: usize, value: &HostValue) -> Result<BindSlot> {
        if let HostValue::Null = value {
            return Ok(BindSlot::Null);
        }
        if let Some(v) = value.as_int32() {
            return Ok(BindSlot::SignedInt(v));
        }
        if let Some(v) = value.as_uint32() {
            return Ok(BindSlot::UnsignedInt(v));
        }
        if let Some(v) = value.as_f64() {
            return Ok(BindSlot::Double(v));
        }

        match value {
            HostValue::Text(s) => BindSlot::text(s),
            HostValue::Date(millis) => utc_time(*millis)
                .map(BindSlot::DateTime)
                .ok_or(Error::DateConversionError { index }),
            other => Err(Error::UnsupportedParameterType {
                index,
                type_name: other.type_name(),
            }),
        }
    }

    /// Text slot holding a private copy of `s`; `OutOfMemory` when the copy
    /// cannot be allocated
    pub fn text(s: &str) -> Result<BindSlot> {
        let mut bytes = try_vec(s.len())?;
        bytes.extend_from_slice(s.as_bytes());
        let bytes = bytes.into_boxed_slice();
        Ok(BindSlot::Text {
            length: bytes.len() as c_ulong,
            bytes,
        })
    }

    /// Native buffer type of the slot
    pub fn field_type(&self) -> enum_field_types {
        match self {
            BindSlot::Null => enum_field_types::MYSQL_TYPE_NULL,
            BindSlot::SignedInt(_) | BindSlot::UnsignedInt(_) => enum_field_types::MYSQL_TYPE_LONG,
            BindSlot::Double(_) => enum_field_types::MYSQL_TYPE_DOUBLE,
            BindSlot::Text { .. } => enum_field_types::MYSQL_TYPE_STRING,
            BindSlot::DateTime(_) => enum_field_types::MYSQL_TYPE_DATETIME,
        }
    }

    /// Check if the slot binds SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, BindSlot::Null)
    }

    /// Check if the slot binds an unsigned integer
    pub fn is_unsigned(&self) -> bool {
        matches!(self, BindSlot::UnsignedInt(_))
    }

    /// Byte length of a text slot
    pub fn length(&self) -> Option<c_ulong> {
        match self {
            BindSlot::Text { length, .. } => Some(*length),
            _ => None,
        }
    }

    /// Number of owned buffers: the payload, plus the length cell for text
    fn buffer_count(&self) -> usize {
        match self {
            BindSlot::Text { .. } => 2,
            _ => 1,
        }
    }

    fn buffer_size(&self) -> usize {
        match self {
            BindSlot::Null => 0,
            BindSlot::SignedInt(_) => size_of::<i32>(),
            BindSlot::UnsignedInt(_) => size_of::<u32>(),
            BindSlot::Double(_) => size_of::<f64>(),
            BindSlot::Text { bytes, .. } => bytes.len() + size_of::<c_ulong>(),
            BindSlot::DateTime(_) => size_of::<MYSQL_TIME>(),
        }
    }

    /// Native descriptor pointing into this slot.
    ///
    /// The descriptor borrows the slot's buffers; it is valid until the slot
    /// is moved or dropped.
    pub fn to_bind(&mut self) -> MYSQL_BIND {
        let mut bind = MYSQL_BIND::zeroed();
        bind.buffer_type = self.field_type();
        bind.is_unsigned = self.is_unsigned();

        // MYSQL_TYPE_NULL needs no buffer: the client library points is_null
        // at its own true indicator
        match self {
            BindSlot::Null => bind.is_null_value = true,
            BindSlot::SignedInt(v) => bind.buffer = v as *mut i32 as *mut c_void,
            BindSlot::UnsignedInt(v) => bind.buffer = v as *mut u32 as *mut c_void,
            BindSlot::Double(v) => bind.buffer = v as *mut f64 as *mut c_void,
            BindSlot::Text { bytes, length } => {
                bind.buffer = bytes.as_mut_ptr() as *mut c_void;
                bind.buffer_length = *length;
                bind.length = length;
            }
            BindSlot::DateTime(t) => bind.buffer = t as *mut MYSQL_TIME as *mut c_void,
        }
        bind
    }
}

/// Empty vector with room for exactly `len` items, or `OutOfMemory`
fn try_vec<T>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
    Ok(v)
}

/// Decompose an epoch-milliseconds instant into UTC calendar fields,
/// whole seconds only.
pub fn utc_time(millis: f64) -> Option<MYSQL_TIME> {
    if !millis.is_finite() {
        return None;
    }
    let secs = (millis / 1000.0).floor();
    if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return None;
    }
    let dt = DateTime::<Utc>::from_timestamp(secs as i64, 0)?;
    let year = u32::try_from(dt.year()).ok()?;

    Some(MYSQL_TIME {
        year,
        month: dt.month(),
        day: dt.day(),
        hour: dt.hour(),
        minute: dt.minute(),
        second: dt.second(),
        time_type: enum_mysql_timestamp_type::MYSQL_TIMESTAMP_DATETIME,
        ..MYSQL_TIME::default()
    })
}

// ============================================================================
// Parameter Buffers
// ============================================================================

/// The full set of bind slots of one statement.
///
/// Slots live in a single boxed slice that is replaced wholesale, never
/// resized, so their addresses stay put while the native side holds them.
///
/// Allocations are accounted to the creating thread, so the buffers must be
/// dropped there too:
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<mysql_bindings::ParamBuffers>();
/// ```
#[derive(Debug)]
pub struct ParamBuffers {
    slots: Box<[BindSlot]>,
    buffers: usize,
    bytes: usize,
    _thread: PhantomData<*const ()>,
}

impl ParamBuffers {
    /// No slots, as held before the first prepare
    pub fn empty() -> Self {
        Self::from_slots(Vec::new())
    }

    /// `count` zero-valued slots, as allocated right after prepare
    pub fn zeroed(count: u64) -> Result<Self> {
        let count = usize::try_from(count).map_err(|_| Error::OutOfMemory)?;
        let mut slots = try_vec(count)?;
        slots.resize(count, BindSlot::Null);
        Ok(Self::from_slots(slots))
    }

    fn from_slots(slots: Vec<BindSlot>) -> Self {
        let buffers = slots.iter().map(BindSlot::buffer_count).sum();
        let bytes = slots.iter().map(BindSlot::buffer_size).sum();
        mem::record_alloc(buffers, bytes);
        Self {
            slots: slots.into_boxed_slice(),
            buffers,
            bytes,
            _thread: PhantomData,
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if there are no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots in parameter order
    pub fn as_slice(&self) -> &[BindSlot] {
        &self.slots
    }

    /// Slots in parameter order, for registration with the native handle
    pub fn as_mut_slice(&mut self) -> &mut [BindSlot] {
        &mut self.slots
    }
}

impl Drop for ParamBuffers {
    fn drop(&mut self) {
        mem::record_free(self.buffers, self.bytes);
    }
}

// ============================================================================
// Binder
// ============================================================================

/// Convert `values` into a fresh set of slots for a statement declaring
/// `param_count` parameters.
///
/// Fails before allocating anything when the counts differ. A value that
/// cannot be converted aborts the whole conversion; slots built so far are
/// dropped with it.
pub fn bind_values(param_count: u64, values: &[HostValue]) -> Result<ParamBuffers> {
    if values.len() as u64 != param_count {
        return Err(Error::ParameterCountMismatch {
            expected: param_count,
            actual: values.len(),
        });
    }

    let mut slots = try_vec(values.len())?;
    for (index, value) in values.iter().enumerate() {
        slots.push(BindSlot::from_host(index, value)?);
    }

    Ok(ParamBuffers::from_slots(slots))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::bind_buffer_status;

    #[test]
    fn test_dispatch_order() {
        let values = vec![
            HostValue::Null,
            HostValue::Number(42.0),
            HostValue::Number(4294967295.0),
            HostValue::Number(3.14),
            HostValue::from("abc"),
        ];
        let buffers = bind_values(5, &values).unwrap();
        let slots = buffers.as_slice();

        assert_eq!(slots[0], BindSlot::Null);
        assert_eq!(slots[1], BindSlot::SignedInt(42));
        assert_eq!(slots[2], BindSlot::UnsignedInt(u32::MAX));
        assert_eq!(slots[3], BindSlot::Double(3.14));
        assert_eq!(slots[4].length(), Some(3));
        assert_eq!(slots[4].field_type(), enum_field_types::MYSQL_TYPE_STRING);
    }

    #[test]
    fn test_integer_boundaries() {
        let slot = |v: HostValue| BindSlot::from_host(0, &v).unwrap();

        assert_eq!(slot(HostValue::Integer(2147483647)), BindSlot::SignedInt(i32::MAX));
        assert_eq!(slot(HostValue::Integer(2147483648)), BindSlot::UnsignedInt(2147483648));
        assert_eq!(slot(HostValue::Integer(4294967296)), BindSlot::Double(4294967296.0));
        assert_eq!(slot(HostValue::Integer(-2147483649)), BindSlot::Double(-2147483649.0));
        assert_eq!(slot(HostValue::Integer(-1)), BindSlot::SignedInt(-1));
        assert_eq!(slot(HostValue::Unsigned(7)), BindSlot::UnsignedInt(7));
        assert_eq!(slot(HostValue::Number(-0.0)), BindSlot::Double(-0.0));
    }

    #[test]
    fn test_datetime_decomposition() {
        // 2024-02-29T13:45:30.999Z
        let slot = BindSlot::from_host(0, &HostValue::Date(1_709_214_330_999.0)).unwrap();
        let BindSlot::DateTime(t) = &slot else {
            panic!("expected datetime slot, got {:?}", slot);
        };
        assert_eq!((t.year, t.month, t.day), (2024, 2, 29));
        assert_eq!((t.hour, t.minute, t.second), (13, 45, 30));
        assert_eq!(t.second_part, 0);
        assert_eq!(t.time_type, enum_mysql_timestamp_type::MYSQL_TIMESTAMP_DATETIME);
    }

    #[test]
    fn test_datetime_before_epoch() {
        // 1969-12-31T23:59:59.500Z floors to :59
        let t = utc_time(-500.0).unwrap();
        assert_eq!((t.year, t.month, t.day), (1969, 12, 31));
        assert_eq!((t.hour, t.minute, t.second), (23, 59, 59));
    }

    #[test]
    fn test_invalid_date() {
        let err = BindSlot::from_host(3, &HostValue::Date(f64::NAN)).unwrap_err();
        assert_eq!(err, Error::DateConversionError { index: 3 });
        assert!(utc_time(1e300).is_none());
    }

    #[test]
    fn test_unsupported_types() {
        for (value, name) in [
            (HostValue::Undefined, "undefined"),
            (HostValue::Boolean(true), "boolean"),
            (HostValue::Array(vec![]), "array"),
            (HostValue::Object(vec![]), "object"),
        ] {
            let err = BindSlot::from_host(1, &value).unwrap_err();
            assert_eq!(
                err,
                Error::UnsupportedParameterType {
                    index: 1,
                    type_name: name
                }
            );
        }
    }

    #[test]
    fn test_count_mismatch_allocates_nothing() {
        let before = bind_buffer_status();
        let err = bind_values(2, &[HostValue::Integer(1)]).unwrap_err();
        assert_eq!(
            err,
            Error::ParameterCountMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(bind_buffer_status().allocated, before.allocated);
    }

    #[test]
    fn test_buffers_released_on_drop() {
        let before = bind_buffer_status();
        {
            let buffers = bind_values(2, &[HostValue::from("hello"), HostValue::Integer(1)]).unwrap();
            // text payload + length cell + int payload
            assert_eq!(bind_buffer_status().outstanding, before.outstanding + 3);
            assert_eq!(buffers.len(), 2);
        }
        assert_eq!(bind_buffer_status().outstanding, before.outstanding);
        assert_eq!(bind_buffer_status().bytes, before.bytes);
    }

    #[test]
    fn test_text_is_a_copy() {
        let mut source = String::from("abc");
        let slot = BindSlot::text(&source).unwrap();
        source.push('d');
        let BindSlot::Text { bytes, length } = slot else {
            panic!("expected text slot");
        };
        assert_eq!(&*bytes, b"abc");
        assert_eq!(length, 3);
    }

    #[test]
    fn test_to_bind_descriptors() {
        let mut slot = BindSlot::UnsignedInt(9);
        let bind = slot.to_bind();
        assert_eq!(bind.buffer_type, enum_field_types::MYSQL_TYPE_LONG);
        assert!(bind.is_unsigned);
        assert!(!bind.buffer.is_null());

        let mut slot = BindSlot::text("xyz").unwrap();
        let bind = slot.to_bind();
        assert_eq!(bind.buffer_length, 3);
        assert!(!bind.length.is_null());

        let mut slot = BindSlot::Null;
        let bind = slot.to_bind();
        assert_eq!(bind.buffer_type, enum_field_types::MYSQL_TYPE_NULL);
        assert!(bind.buffer.is_null());
        assert!(bind.is_null_value);
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        assert_eq!(try_vec::<u8>(usize::MAX).unwrap_err(), Error::OutOfMemory);
        assert!(matches!(ParamBuffers::zeroed(u64::MAX), Err(Error::OutOfMemory)));
        assert!(try_vec::<u8>(5).unwrap().capacity() >= 5);
    }

    #[test]
    fn test_zeroed_slots() {
        let buffers = ParamBuffers::zeroed(3).unwrap();
        assert_eq!(buffers.len(), 3);
        assert!(buffers.as_slice().iter().all(BindSlot::is_null));
        assert!(ParamBuffers::empty().is_empty());
    }
}
