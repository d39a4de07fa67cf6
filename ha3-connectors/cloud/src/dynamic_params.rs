use ha3_core::{
    data::{chrono::DateTime, DataValue, DATE_TIME_WITH_TZ_FORMAT},
    err::{bail, Context, DriverError, Result},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{data::parse_number, val_to_json};

/// Raised when a null value reaches a dynamic parameter
pub const EMPTY_PARAM_MSG: &str = "empty params!";

/// Characters left untouched by form url-encoding
const FORM_URLENCODED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'*');

/// Encodes the values in the inline form, eg `[[1, "a", '2024-01-02T03:04:05.000+0800']]`
pub fn encode_inline(values: &[DataValue]) -> Result<String> {
    let encoded = values
        .iter()
        .map(encode_inline_value)
        .collect::<Result<Vec<_>>>()?;

    Ok(format!("[[{}]]", encoded.join(", ")))
}

fn encode_inline_value(val: &DataValue) -> Result<String> {
    Ok(match val {
        DataValue::Null => return Err(DriverError::empty_param(EMPTY_PARAM_MSG).into()),
        DataValue::Utf8String(s) | DataValue::JSON(s) => serde_json::to_string(s)?,
        DataValue::Boolean(b) => b.to_string(),
        DataValue::Int8(v) => v.to_string(),
        DataValue::UInt8(v) => v.to_string(),
        DataValue::Int16(v) => v.to_string(),
        DataValue::UInt16(v) => v.to_string(),
        DataValue::Int32(v) => v.to_string(),
        DataValue::UInt32(v) => v.to_string(),
        DataValue::Int64(v) => v.to_string(),
        DataValue::UInt64(v) => v.to_string(),
        DataValue::Float32(v) if v.is_finite() => format!("{:?}", v),
        DataValue::Float64(v) if v.is_finite() => format!("{:?}", v),
        DataValue::Float32(_) | DataValue::Float64(_) => {
            return Err(DriverError::invalid_param(format!("cannot encode {:?}", val)).into())
        }
        DataValue::Decimal(v) => v.to_string(),
        DataValue::Date(d) => match d.and_hms_opt(0, 0, 0) {
            Some(dt) => format!("'{}'", dt.format("%Y-%m-%dT%H:%M:%S%.3f+0000")),
            None => bail!("Invalid date {}", d),
        },
        DataValue::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%dT%H:%M:%S%.3f+0000")),
        DataValue::DateTimeWithTZ(dt) => format!("'{}'", dt.format(DATE_TIME_WITH_TZ_FORMAT)),
    })
}

/// Parses the inline form back into values.
///
/// Integers decode as 64-bit, fractional numbers as decimals where exact,
/// temporal values carry their offset.
pub fn decode_inline(encoded: &str) -> Result<Vec<DataValue>> {
    let inner = encoded
        .trim()
        .strip_prefix("[[")
        .and_then(|s| s.strip_suffix("]]"))
        .with_context(|| format!("Invalid dynamic params '{}'", encoded))?;

    let chars = inner.char_indices().collect::<Vec<_>>();
    let mut values = vec![];
    let mut i = 0;

    loop {
        while i < chars.len() && chars[i].1.is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let start = chars[i].0;
        let (val, next) = match chars[i].1 {
            '"' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].1 != '"' {
                    if chars[j].1 == '\\' {
                        j += 1;
                    }
                    j += 1;
                }
                if j >= chars.len() {
                    bail!("Unterminated string in dynamic params '{}'", encoded);
                }
                let token = &inner[start..chars[j].0 + 1];
                let s: String = serde_json::from_str(token)
                    .with_context(|| format!("Invalid string {}", token))?;
                (DataValue::Utf8String(s), j + 1)
            }
            '\'' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].1 != '\'' {
                    j += 1;
                }
                if j >= chars.len() {
                    bail!("Unterminated timestamp in dynamic params '{}'", encoded);
                }
                let token = &inner[chars[i + 1].0..chars[j].0];
                let dt = DateTime::parse_from_str(token, DATE_TIME_WITH_TZ_FORMAT)
                    .with_context(|| format!("Invalid timestamp '{}'", token))?;
                (DataValue::DateTimeWithTZ(dt), j + 1)
            }
            _ => {
                let mut j = i;
                while j < chars.len() && chars[j].1 != ',' {
                    j += 1;
                }
                let end = chars.get(j).map(|c| c.0).unwrap_or(inner.len());
                let token = inner[start..end].trim();
                let val = match token {
                    "true" => DataValue::Boolean(true),
                    "false" => DataValue::Boolean(false),
                    _ => parse_number(token)
                        .with_context(|| format!("Invalid dynamic param '{}'", token))?,
                };
                (val, j)
            }
        };

        values.push(val);
        i = next;

        while i < chars.len() && chars[i].1.is_whitespace() {
            i += 1;
        }
        if i < chars.len() {
            if chars[i].1 != ',' {
                bail!("Expected ',' in dynamic params '{}'", encoded);
            }
            i += 1;
        }
    }

    Ok(values)
}

/// Encodes the values as the json payload form, a json array nested in an outer array.
/// Non-ascii characters are escaped and the result is url-encoded when requested.
pub fn encode_json_payload(values: &[DataValue], url_encode: bool) -> Result<String> {
    let mut json = vec![];
    for val in values {
        if val.is_null() {
            return Err(DriverError::empty_param(EMPTY_PARAM_MSG).into());
        }
        json.push(val_to_json(val.clone())?);
    }

    let payload = format!("[{}]", serde_json::to_string(&json)?);
    let payload = escape_non_ascii(&payload);

    Ok(if url_encode {
        form_urlencode(&payload)
    } else {
        payload
    })
}

/// Escapes every non-ascii UTF-16 code unit as `\uXXXX`
pub fn escape_non_ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());

    for unit in s.encode_utf16() {
        if unit < 0x80 {
            out.push(unit as u8 as char);
        } else {
            out.push_str(&format!("\\u{:04x}", unit));
        }
    }

    out
}

/// Percent-encodes using the form encoding, spaces become '+'
pub fn form_urlencode(s: &str) -> String {
    utf8_percent_encode(s, FORM_URLENCODED)
        .to_string()
        .replace("%20", "+")
}
