//! Value types for stored properties.
//!
//! Every [`Value`] variant corresponds to exactly one [`ValueType`], which
//! decides its storage byte contract.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

use crate::error::ParseValueError;
use crate::util::datetime;

/// Scalar value types a property, list item, set item or map key can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueType {
    Bool = 1,
    Int32 = 2,
    Int64 = 3,
    UInt32 = 4,
    UInt64 = 5,
    Float64 = 6,
    Text = 7,
    Bytes = 8,
    Date = 9,
    Time = 10,
    DateTime = 11,
    Enum = 12,
    Uuid = 13,
}

impl ValueType {
    /// Fixed storage width in bytes, or `None` for variable length types.
    pub fn byte_size(self) -> Option<usize> {
        match self {
            ValueType::Bool => Some(1),
            ValueType::Enum => Some(2),
            ValueType::Int32 | ValueType::UInt32 | ValueType::Date | ValueType::Time => Some(4),
            ValueType::Int64 | ValueType::UInt64 | ValueType::Float64 | ValueType::DateTime => {
                Some(8)
            }
            ValueType::Uuid => Some(16),
            ValueType::Text | ValueType::Bytes => None,
        }
    }

    /// Returns true if the type has a fixed storage width.
    pub fn is_fixed_size(self) -> bool {
        self.byte_size().is_some()
    }
}

/// Calendar date as days since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Date {
    pub days: i32,
}

impl Date {
    /// Creates a date from a civil year, month and day.
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            days: datetime::date_to_days(year, month, day),
        }
    }
}

/// Time of day as milliseconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Time {
    pub millis: u32,
}

impl Time {
    pub fn new(hour: u32, minute: u32, second: u32) -> Self {
        Self {
            millis: datetime::time_to_millis(hour, minute, second, 0),
        }
    }
}

/// Point in time as milliseconds since the Unix epoch, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTime {
    pub epoch_millis: i64,
}

impl DateTime {
    /// Creates a UTC date time from civil components.
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        let days = datetime::date_to_days(year, month, day) as i64;
        let millis = datetime::time_to_millis(hour, minute, second, 0) as i64;
        Self {
            epoch_millis: days * datetime::MILLIS_PER_DAY + millis,
        }
    }
}

/// A typed scalar value.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    /// Ordered and compared with `f64::total_cmp`.
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(Date),
    Time(Time),
    DateTime(DateTime),
    /// Enum ordinal.
    Enum(u16),
    Uuid(Uuid),
}

impl Value {
    /// Returns the value type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::UInt32(_) => ValueType::UInt32,
            Value::UInt64(_) => ValueType::UInt64,
            Value::Float64(_) => ValueType::Float64,
            Value::Text(_) => ValueType::Text,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Date(_) => ValueType::Date,
            Value::Time(_) => ValueType::Time,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Enum(_) => ValueType::Enum,
            Value::Uuid(_) => ValueType::Uuid,
        }
    }

    /// Shorthand for a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Shorthand for a date value.
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Value::Date(Date::new(year, month, day))
    }

    /// Shorthand for a UTC date time value.
    pub fn date_time(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Value::DateTime(DateTime::new(year, month, day, hour, minute, second))
    }

    fn rank(&self) -> u8 {
        self.value_type() as u8
    }
}

/// A multi-type value as stored: the variant tag and, for simple variants,
/// the inline value. `None` means the variant is complex and its contents
/// live in nested qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypedValue {
    pub tag: u32,
    pub value: Option<Value>,
}

impl TypedValue {
    pub fn new(tag: u32, value: impl Into<Value>) -> Self {
        Self {
            tag,
            value: Some(value.into()),
        }
    }

    /// A switch to a complex variant without inline payload.
    pub fn complex(tag: u32) -> Self {
        Self { tag, value: None }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::UInt32(a), Value::UInt32(b)) => a.cmp(b),
            (Value::UInt64(a), Value::UInt64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Enum(a), Value::Enum(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Bool(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::UInt32(v) => v.hash(state),
            Value::UInt64(v) => v.hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::Text(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::Enum(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(v) => write!(f, "0x{}", hex::encode(v)),
            Value::Date(d) => f.write_str(&datetime::format_date(d.days)),
            Value::Time(t) => f.write_str(&datetime::format_time(t.millis)),
            Value::DateTime(dt) => f.write_str(&datetime::format_datetime(dt.epoch_millis)),
            Value::Enum(v) => write!(f, "enum({})", v),
            Value::Uuid(v) => write!(f, "{}", v),
        }
    }
}

impl Value {
    /// Parses a value of `value_type` from its text form, the inverse of
    /// `Display` (text is taken verbatim, bytes as `0x`-prefixed hex).
    pub fn parse(value_type: ValueType, input: &str) -> Result<Value, ParseValueError> {
        let invalid = || ParseValueError::Invalid {
            value_type,
            input: input.to_string(),
        };
        let value = match value_type {
            ValueType::Bool => Value::Bool(input.parse().map_err(|_| invalid())?),
            ValueType::Int32 => Value::Int32(input.parse().map_err(|_| invalid())?),
            ValueType::Int64 => Value::Int64(input.parse().map_err(|_| invalid())?),
            ValueType::UInt32 => Value::UInt32(input.parse().map_err(|_| invalid())?),
            ValueType::UInt64 => Value::UInt64(input.parse().map_err(|_| invalid())?),
            ValueType::Float64 => Value::Float64(input.parse().map_err(|_| invalid())?),
            ValueType::Text => Value::Text(input.to_string()),
            ValueType::Bytes => {
                let digits = input.strip_prefix("0x").unwrap_or(input);
                Value::Bytes(hex::decode(digits).map_err(|_| invalid())?)
            }
            ValueType::Date => Value::Date(Date {
                days: datetime::parse_date(input)?,
            }),
            ValueType::Time => Value::Time(Time {
                millis: datetime::parse_time(input)?,
            }),
            ValueType::DateTime => Value::DateTime(DateTime {
                epoch_millis: datetime::parse_datetime(input)?,
            }),
            ValueType::Enum => Value::Enum(
                input
                    .strip_prefix("enum(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .unwrap_or(input)
                    .parse()
                    .map_err(|_| invalid())?,
            ),
            ValueType::Uuid => Value::Uuid(Uuid::parse_str(input).map_err(|_| invalid())?),
        };
        Ok(value)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Date> for Value {
    fn from(v: Date) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime> for Value {
    fn from(v: DateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}
