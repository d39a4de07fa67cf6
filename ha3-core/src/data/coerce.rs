use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::{prelude::ToPrimitive, Decimal};

use super::{DataType, DataValue};

/// The textual format used for timestamps with an offset
pub const DATE_TIME_WITH_TZ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl DataValue {
    /// Tries to coerce the data value into the supplied type.
    ///
    /// Coercions which would discard data, such as narrowing an integer
    /// out of range or truncating a fraction, are rejected.
    pub fn try_coerce_into(self, r#type: &DataType) -> Result<Self> {
        // Nulls are type-independent
        if self.is_null() || r#type == &DataType::Null {
            return if self.is_null() {
                Ok(self)
            } else {
                bail!("Cannot coerce {:?} into null", self)
            };
        }

        if &self.r#type() == r#type {
            return Ok(self);
        }

        match self {
            DataValue::Null => Ok(DataValue::Null),
            DataValue::Utf8String(data) => Self::try_coerce_utf8_string(data, r#type),
            DataValue::Boolean(data) => match r#type {
                DataType::Utf8String => Ok(DataValue::Utf8String(data.to_string())),
                DataType::JSON => Ok(DataValue::JSON(data.to_string())),
                _ => Self::try_coerce_integer(data as i128, r#type),
            },
            DataValue::Int8(data) => Self::try_coerce_integer(data as i128, r#type),
            DataValue::UInt8(data) => Self::try_coerce_integer(data as i128, r#type),
            DataValue::Int16(data) => Self::try_coerce_integer(data as i128, r#type),
            DataValue::UInt16(data) => Self::try_coerce_integer(data as i128, r#type),
            DataValue::Int32(data) => Self::try_coerce_integer(data as i128, r#type),
            DataValue::UInt32(data) => Self::try_coerce_integer(data as i128, r#type),
            DataValue::Int64(data) => Self::try_coerce_integer(data as i128, r#type),
            DataValue::UInt64(data) => Self::try_coerce_integer(data as i128, r#type),
            DataValue::Float32(data) => match r#type {
                DataType::Utf8String => Ok(DataValue::Utf8String(data.to_string())),
                _ => Self::try_coerce_float(data as f64, r#type),
            },
            DataValue::Float64(data) => Self::try_coerce_float(data, r#type),
            DataValue::Decimal(data) => Self::try_coerce_decimal(data, r#type),
            DataValue::JSON(data) => match r#type {
                DataType::Utf8String => Ok(DataValue::Utf8String(data)),
                _ => {
                    let json: serde_json::Value =
                        serde_json::from_str(&data).context("Failed to parse json")?;
                    match json {
                        serde_json::Value::String(s) => Self::try_coerce_utf8_string(s, r#type),
                        serde_json::Value::Bool(b) => DataValue::Boolean(b).try_coerce_into(r#type),
                        serde_json::Value::Number(n) => {
                            Self::try_coerce_utf8_string(n.to_string(), r#type)
                        }
                        _ => bail!("Cannot coerce json {} into {:?}", data, r#type),
                    }
                }
            },
            DataValue::Date(data) => match r#type {
                DataType::Utf8String => {
                    Ok(DataValue::Utf8String(data.format(DATE_FORMAT).to_string()))
                }
                DataType::DateTime => Ok(DataValue::DateTime(
                    data.and_hms_opt(0, 0, 0).context("Invalid date")?,
                )),
                _ => bail!("Cannot coerce date {} into {:?}", data, r#type),
            },
            DataValue::DateTime(data) => match r#type {
                DataType::Utf8String => Ok(DataValue::Utf8String(
                    data.format(DATE_TIME_FORMAT).to_string(),
                )),
                DataType::Date if data.date().and_hms_opt(0, 0, 0) == Some(data) => {
                    Ok(DataValue::Date(data.date()))
                }
                _ => bail!("Cannot coerce date time {} into {:?}", data, r#type),
            },
            DataValue::DateTimeWithTZ(data) => match r#type {
                DataType::Utf8String => Ok(DataValue::Utf8String(
                    data.format(DATE_TIME_WITH_TZ_FORMAT).to_string(),
                )),
                DataType::DateTime if data.offset().local_minus_utc() == 0 => {
                    Ok(DataValue::DateTime(data.naive_utc()))
                }
                _ => bail!("Cannot coerce date time {} into {:?}", data, r#type),
            },
        }
    }

    fn try_coerce_utf8_string(data: String, r#type: &DataType) -> Result<DataValue> {
        let res = match r#type {
            DataType::Utf8String => Some(DataValue::Utf8String(data.clone())),
            DataType::JSON if serde_json::from_str::<serde_json::Value>(&data).is_ok() => {
                Some(DataValue::JSON(data.clone()))
            }
            DataType::Boolean => match data.as_str() {
                "true" | "1" => Some(DataValue::Boolean(true)),
                "false" | "0" => Some(DataValue::Boolean(false)),
                _ => None,
            },
            DataType::Int8 => data.parse().ok().map(DataValue::Int8),
            DataType::UInt8 => data.parse().ok().map(DataValue::UInt8),
            DataType::Int16 => data.parse().ok().map(DataValue::Int16),
            DataType::UInt16 => data.parse().ok().map(DataValue::UInt16),
            DataType::Int32 => data.parse().ok().map(DataValue::Int32),
            DataType::UInt32 => data.parse().ok().map(DataValue::UInt32),
            DataType::Int64 => data.parse().ok().map(DataValue::Int64),
            DataType::UInt64 => data.parse().ok().map(DataValue::UInt64),
            DataType::Float32 => data.parse().ok().map(DataValue::Float32),
            DataType::Float64 => data.parse().ok().map(DataValue::Float64),
            DataType::Decimal => data.parse().ok().map(DataValue::Decimal),
            DataType::Date => NaiveDate::parse_from_str(&data, DATE_FORMAT)
                .ok()
                .map(DataValue::Date),
            DataType::DateTime => NaiveDateTime::parse_from_str(&data, DATE_TIME_FORMAT)
                .ok()
                .map(DataValue::DateTime),
            DataType::DateTimeWithTZ => DateTime::parse_from_str(&data, DATE_TIME_WITH_TZ_FORMAT)
                .or_else(|_| DateTime::parse_from_rfc3339(&data))
                .ok()
                .map(DataValue::DateTimeWithTZ),
            _ => None,
        };

        match res {
            Some(val) => Ok(val),
            None => bail!("Cannot coerce string '{}' into {:?}", data, r#type),
        }
    }

    fn try_coerce_integer(data: i128, r#type: &DataType) -> Result<DataValue> {
        let ctx = || format!("Cannot coerce {} into {:?}", data, r#type);

        Ok(match r#type {
            DataType::Int8 => DataValue::Int8(i8::try_from(data).with_context(ctx)?),
            DataType::UInt8 => DataValue::UInt8(u8::try_from(data).with_context(ctx)?),
            DataType::Int16 => DataValue::Int16(i16::try_from(data).with_context(ctx)?),
            DataType::UInt16 => DataValue::UInt16(u16::try_from(data).with_context(ctx)?),
            DataType::Int32 => DataValue::Int32(i32::try_from(data).with_context(ctx)?),
            DataType::UInt32 => DataValue::UInt32(u32::try_from(data).with_context(ctx)?),
            DataType::Int64 => DataValue::Int64(i64::try_from(data).with_context(ctx)?),
            DataType::UInt64 => DataValue::UInt64(u64::try_from(data).with_context(ctx)?),
            DataType::Float32 if data.abs() <= 1 << 24 => DataValue::Float32(data as f32),
            DataType::Float64 if data.abs() <= 1 << 53 => DataValue::Float64(data as f64),
            DataType::Decimal => DataValue::Decimal(
                Decimal::try_from_i128_with_scale(data, 0).with_context(ctx)?,
            ),
            DataType::Boolean if data == 0 || data == 1 => DataValue::Boolean(data == 1),
            DataType::Utf8String => DataValue::Utf8String(data.to_string()),
            DataType::JSON => DataValue::JSON(data.to_string()),
            _ => bail!(ctx()),
        })
    }

    fn try_coerce_float(data: f64, r#type: &DataType) -> Result<DataValue> {
        Ok(match r#type {
            DataType::Float64 => DataValue::Float64(data),
            DataType::Float32 if (data as f32) as f64 == data || data.is_nan() => {
                DataValue::Float32(data as f32)
            }
            DataType::Decimal if data.is_finite() => DataValue::Decimal(
                Decimal::try_from(data)
                    .with_context(|| format!("Cannot coerce {} into decimal", data))?,
            ),
            r#type if r#type.is_integer() && data.is_finite() && data.fract() == 0.0 => {
                Self::try_coerce_integer(data as i128, r#type)?
            }
            DataType::Utf8String => DataValue::Utf8String(data.to_string()),
            DataType::JSON if data.is_finite() => DataValue::JSON(data.to_string()),
            _ => bail!("Cannot coerce {} into {:?}", data, r#type),
        })
    }

    fn try_coerce_decimal(data: Decimal, r#type: &DataType) -> Result<DataValue> {
        Ok(match r#type {
            DataType::Utf8String => DataValue::Utf8String(data.to_string()),
            DataType::JSON => DataValue::JSON(data.to_string()),
            DataType::Float64 | DataType::Float32 => {
                let float = data
                    .to_f64()
                    .with_context(|| format!("Cannot coerce {} into {:?}", data, r#type))?;
                Self::try_coerce_float(float, r#type)?
            }
            r#type if data.fract().is_zero() => {
                let int = data
                    .to_i128()
                    .with_context(|| format!("Cannot coerce {} into {:?}", data, r#type))?;
                Self::try_coerce_integer(int, r#type)?
            }
            _ => bail!("Cannot coerce {} into {:?}", data, r#type),
        })
    }
}
