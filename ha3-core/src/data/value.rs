use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use enum_as_inner::EnumAsInner;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DataType;

/// Data container for respective types
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, EnumAsInner)]
pub enum DataValue {
    Null,
    Utf8String(String),
    Boolean(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    JSON(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeWithTZ(DateTime<FixedOffset>),
}

impl DataValue {
    pub fn r#type(&self) -> DataType {
        DataType::from(self)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::Utf8String(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::Utf8String(v)
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Boolean(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Int32(v)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::Int64(v)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Float64(v)
    }
}

impl From<Decimal> for DataValue {
    fn from(v: Decimal) -> Self {
        DataValue::Decimal(v)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DataValue::Null)
    }
}
