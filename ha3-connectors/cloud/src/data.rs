use ha3_core::{
    data::{
        rust_decimal::{prelude::ToPrimitive, Decimal},
        DataType, DataValue, DATE_TIME_WITH_TZ_FORMAT,
    },
    err::{bail, Context, Result},
};
use sqlparser::ast::{Expr, UnaryOperator, Value};

/// Converts a DataValue to json
pub fn val_to_json(val: DataValue) -> Result<serde_json::Value> {
    let res = match val {
        DataValue::Null => serde_json::Value::Null,
        DataValue::Utf8String(v) => serde_json::Value::String(v),
        DataValue::Boolean(b) => serde_json::Value::Bool(b),
        DataValue::Int8(v) => v.into(),
        DataValue::UInt8(v) => v.into(),
        DataValue::Int16(v) => v.into(),
        DataValue::UInt16(v) => v.into(),
        DataValue::Int32(v) => v.into(),
        DataValue::UInt32(v) => v.into(),
        DataValue::Int64(v) => v.into(),
        DataValue::UInt64(v) => v.into(),
        DataValue::Float32(v) => float_to_json(v as f64)?,
        DataValue::Float64(v) => float_to_json(v)?,
        DataValue::Decimal(v) => match (v.fract().is_zero(), v.to_i64(), v.to_f64()) {
            (true, Some(int), _) => int.into(),
            (_, _, Some(float)) => float_to_json(float)?,
            _ => serde_json::Value::String(v.to_string()),
        },
        DataValue::JSON(v) => serde_json::from_str(&v).context("Failed to parse json")?,
        DataValue::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        DataValue::DateTime(dt) => {
            serde_json::Value::String(dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        }
        DataValue::DateTimeWithTZ(dt) => {
            serde_json::Value::String(dt.format(DATE_TIME_WITH_TZ_FORMAT).to_string())
        }
    };

    Ok(res)
}

fn float_to_json(v: f64) -> Result<serde_json::Value> {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .with_context(|| format!("Cannot represent {} as json", v))
}

/// Decodes a json cell of a result row through the column type
pub fn json_to_val(json: &serde_json::Value, r#type: &DataType) -> Result<DataValue> {
    let val = match (json, r#type) {
        (serde_json::Value::Null, _) => DataValue::Null,
        (json, DataType::JSON) => DataValue::JSON(json.to_string()),
        (serde_json::Value::Bool(b), _) => DataValue::Boolean(*b),
        (serde_json::Value::Number(n), DataType::Float32) => match n.as_f64() {
            Some(f) => DataValue::Float32(f as f32),
            None => bail!("Invalid float {}", n),
        },
        (serde_json::Value::Number(n), _) => {
            if let Some(int) = n.as_i64() {
                DataValue::Int64(int)
            } else if let Some(int) = n.as_u64() {
                DataValue::UInt64(int)
            } else {
                match n.as_f64() {
                    Some(f) => DataValue::Float64(f),
                    None => bail!("Invalid number {}", n),
                }
            }
        }
        (serde_json::Value::String(s), _) => DataValue::Utf8String(s.clone()),
        (json, _) => DataValue::JSON(json.to_string()),
    };

    val.try_coerce_into(r#type)
        .with_context(|| format!("Failed to decode {} as {:?}", json, r#type))
}

/// Maps the engine's column type names onto data types
pub fn from_ha3_type(name: &str) -> DataType {
    match name.to_ascii_lowercase().as_str() {
        "int8" => DataType::Int8,
        "uint8" => DataType::UInt8,
        "int16" => DataType::Int16,
        "uint16" => DataType::UInt16,
        "int32" => DataType::Int32,
        "uint32" => DataType::UInt32,
        "int64" => DataType::Int64,
        "uint64" => DataType::UInt64,
        "float" => DataType::Float32,
        "double" => DataType::Float64,
        "bool" | "boolean" => DataType::Boolean,
        "string" | "char" | "text" => DataType::Utf8String,
        _ => DataType::JSON,
    }
}

/// Converts a SQL literal into a value, `None` if the expression is not a literal
pub fn sql_literal_to_val(expr: &Expr) -> Option<DataValue> {
    match expr {
        Expr::Value(v) => sql_value_to_val(&v.value),
        Expr::Nested(inner) => sql_literal_to_val(inner),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match expr.as_ref() {
            Expr::Value(v) if matches!(v.value, Value::Number(..)) => {
                negate(sql_value_to_val(&v.value)?)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Converts a parsed SQL value into a DataValue
pub fn sql_value_to_val(value: &Value) -> Option<DataValue> {
    match value {
        Value::Number(n, _) => parse_number(n),
        Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => {
            Some(DataValue::Utf8String(s.clone()))
        }
        Value::Boolean(b) => Some(DataValue::Boolean(*b)),
        Value::Null => Some(DataValue::Null),
        _ => None,
    }
}

/// Parses a numeric literal, preferring integers then exact decimals
pub fn parse_number(n: &str) -> Option<DataValue> {
    if let Ok(int) = n.parse::<i64>() {
        Some(DataValue::Int64(int))
    } else if let (false, Ok(dec)) = (n.contains(['e', 'E']), n.parse::<Decimal>()) {
        Some(DataValue::Decimal(dec))
    } else {
        n.parse::<f64>().ok().map(DataValue::Float64)
    }
}

fn negate(val: DataValue) -> Option<DataValue> {
    match val {
        DataValue::Int64(v) => v.checked_neg().map(DataValue::Int64),
        DataValue::Decimal(v) => Some(DataValue::Decimal(-v)),
        DataValue::Float64(v) => Some(DataValue::Float64(-v)),
        _ => None,
    }
}
