use ha3_connectors_base::interface::{ResultSet, RowStructure};
use ha3_core::{
    data::{
        chrono::{NaiveDate, NaiveDateTime},
        rust_decimal::Decimal,
        DataType, DataValue,
    },
    err::{bail, Context, DriverError, ErrorCode, ErrorInfo, Result},
};
use serde::Deserialize;

use crate::{from_ha3_type, json_to_val};

/// A column of the result, typed by the engine's type name
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ha3Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Deserialize)]
struct Ha3ResultBody {
    #[serde(default)]
    columns: Option<Vec<Ha3Column>>,
    #[serde(default)]
    rows: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    error: Option<ErrorInfo>,
}

/// A forward-only cursor over a query response
#[derive(Debug, Clone)]
pub struct Ha3ResultSet {
    columns: Vec<Ha3Column>,
    rows: Vec<Vec<serde_json::Value>>,
    /// One-based, 0 is before the first row
    row: usize,
    after_last: bool,
    was_null: bool,
    error_info: Option<ErrorInfo>,
}

impl Ha3ResultSet {
    /// Parses the response body. An unparseable body yields an empty
    /// result set carrying the parse error in its error info.
    pub fn new(body: &str) -> Self {
        match serde_json::from_str::<Ha3ResultBody>(body) {
            Ok(res) => Self {
                columns: res.columns.unwrap_or_default(),
                rows: res.rows.unwrap_or_default(),
                row: 0,
                after_last: false,
                was_null: false,
                error_info: res.error,
            },
            Err(err) => Self {
                columns: vec![],
                rows: vec![],
                row: 0,
                after_last: false,
                was_null: true,
                error_info: Some(ErrorInfo::new(
                    500,
                    "initJsonArrayList exception",
                    format!("detail error{}", err),
                )),
            },
        }
    }

    pub fn error_info(&self) -> Option<&ErrorInfo> {
        self.error_info.as_ref()
    }

    pub fn was_null(&self) -> bool {
        self.was_null
    }

    pub fn columns(&self) -> &[Ha3Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Advances the cursor, returning whether a row is available
    pub fn next(&mut self) -> bool {
        if self.row < self.rows.len() {
            self.row += 1;
            return true;
        }

        if !self.rows.is_empty() {
            self.after_last = true;
        }

        false
    }

    /// The current (one-based) row number, 0 when there is no current row
    pub fn row(&self) -> usize {
        if self.after_last {
            0
        } else {
            self.row
        }
    }

    pub fn is_before_first(&self) -> bool {
        !self.rows.is_empty() && self.row == 0
    }

    pub fn is_first(&self) -> bool {
        !self.after_last && self.row == 1
    }

    pub fn is_last(&self) -> bool {
        !self.after_last && self.row > 0 && self.row == self.rows.len()
    }

    pub fn is_after_last(&self) -> bool {
        self.after_last
    }

    pub fn absolute(&mut self, _row: i64) -> Result<bool> {
        Err(forward_only())
    }

    pub fn relative(&mut self, _rows: i64) -> Result<bool> {
        Err(forward_only())
    }

    pub fn first(&mut self) -> Result<bool> {
        Err(forward_only())
    }

    pub fn last(&mut self) -> Result<bool> {
        Err(forward_only())
    }

    pub fn before_first(&mut self) -> Result<()> {
        Err(forward_only())
    }

    pub fn after_last(&mut self) -> Result<()> {
        Err(forward_only())
    }

    /// Zero-based index of the first column with the label
    pub fn find_column(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == label)
    }

    fn column(&self, idx: usize) -> Result<&Ha3Column> {
        self.columns.get(idx).ok_or_else(|| {
            DriverError::invalid_param(format!(
                "column index {} out of range, result has {} columns",
                idx,
                self.columns.len()
            ))
            .into()
        })
    }

    fn index_of(&self, label: &str) -> Result<usize> {
        self.find_column(label).ok_or_else(|| {
            DriverError::invalid_param(format!("column '{}' not found", label)).into()
        })
    }

    /// The raw json cell of the current row
    pub fn get_object(&self, idx: usize) -> Result<&serde_json::Value> {
        self.column(idx)?;

        if self.row == 0 || self.after_last {
            bail!("No current row, call next() first");
        }

        self.rows[self.row - 1]
            .get(idx)
            .with_context(|| format!("Row {} has no column {}", self.row, idx))
    }

    pub fn get_object_by_label(&self, label: &str) -> Result<&serde_json::Value> {
        self.get_object(self.index_of(label)?)
    }

    /// Decodes the cell of the current row through its column type
    pub fn get(&self, idx: usize) -> Result<DataValue> {
        let col = self.column(idx)?;
        let r#type = from_ha3_type(&col.type_name);

        json_to_val(self.get_object(idx)?, &r#type).map_err(|err| {
            DriverError::new(
                ErrorCode::FailToConvertColumnType,
                format!("column '{}' of type [{}]: {:#}", col.name, col.type_name, err),
            )
            .into()
        })
    }

    pub fn get_by_label(&self, label: &str) -> Result<DataValue> {
        self.get(self.index_of(label)?)
    }

    fn get_as<T>(
        &self,
        idx: usize,
        r#type: DataType,
        extract: impl FnOnce(DataValue) -> Option<T>,
    ) -> Result<Option<T>> {
        let val = self.get(idx)?;
        if val.is_null() {
            return Ok(None);
        }

        let col = self.column(idx)?;
        let converted = val.clone().try_coerce_into(&r#type).ok().and_then(extract);

        match converted {
            Some(v) => Ok(Some(v)),
            None => Err(DriverError::new(
                ErrorCode::FailToConvertColumnType,
                format!(
                    "Unable to convert value [{:?}] of type [{}] to {:?}",
                    val, col.type_name, r#type
                ),
            )
            .into()),
        }
    }

    /// Reads the cell as text, non-string values are rendered as json
    pub fn get_string(&self, idx: usize) -> Result<Option<String>> {
        Ok(match self.get_object(idx)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }

    pub fn get_bool(&self, idx: usize) -> Result<Option<bool>> {
        self.get_as(idx, DataType::Boolean, |v| v.into_boolean().ok())
    }

    pub fn get_i8(&self, idx: usize) -> Result<Option<i8>> {
        self.get_as(idx, DataType::Int8, |v| v.into_int8().ok())
    }

    pub fn get_i16(&self, idx: usize) -> Result<Option<i16>> {
        self.get_as(idx, DataType::Int16, |v| v.into_int16().ok())
    }

    pub fn get_i32(&self, idx: usize) -> Result<Option<i32>> {
        self.get_as(idx, DataType::Int32, |v| v.into_int32().ok())
    }

    pub fn get_i64(&self, idx: usize) -> Result<Option<i64>> {
        self.get_as(idx, DataType::Int64, |v| v.into_int64().ok())
    }

    pub fn get_f32(&self, idx: usize) -> Result<Option<f32>> {
        self.get_as(idx, DataType::Float32, |v| v.into_float32().ok())
    }

    pub fn get_f64(&self, idx: usize) -> Result<Option<f64>> {
        self.get_as(idx, DataType::Float64, |v| v.into_float64().ok())
    }

    pub fn get_decimal(&self, idx: usize) -> Result<Option<Decimal>> {
        self.get_as(idx, DataType::Decimal, |v| v.into_decimal().ok())
    }

    pub fn get_date(&self, idx: usize) -> Result<Option<NaiveDate>> {
        self.get_as(idx, DataType::Date, |v| v.into_date().ok())
    }

    pub fn get_date_time(&self, idx: usize) -> Result<Option<NaiveDateTime>> {
        self.get_as(idx, DataType::DateTime, |v| v.into_date_time().ok())
    }

    pub fn metadata(&self) -> Ha3ResultSetMetadata<'_> {
        Ha3ResultSetMetadata {
            columns: &self.columns,
        }
    }
}

impl ResultSet for Ha3ResultSet {
    fn get_structure(&self) -> Result<RowStructure> {
        Ok(RowStructure::new(
            self.columns
                .iter()
                .map(|c| (c.name.clone(), from_ha3_type(&c.type_name)))
                .collect(),
        ))
    }

    fn next_row(&mut self) -> Result<bool> {
        Ok(self.next())
    }

    fn get_value(&mut self, idx: usize) -> Result<DataValue> {
        self.get(idx)
    }
}

fn forward_only() -> ha3_core::err::Error {
    DriverError::unsupported("ResultSet is forward-only").into()
}

/// Column metadata of a result set
#[derive(Debug, Clone, Copy)]
pub struct Ha3ResultSetMetadata<'a> {
    columns: &'a [Ha3Column],
}

impl<'a> Ha3ResultSetMetadata<'a> {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_name(&self, idx: usize) -> Option<&'a str> {
        self.columns.get(idx).map(|c| c.name.as_str())
    }

    pub fn column_type_name(&self, idx: usize) -> Option<&'a str> {
        self.columns.get(idx).map(|c| c.type_name.as_str())
    }

    pub fn is_signed(&self, idx: usize) -> Option<bool> {
        self.column_type_name(idx).map(is_signed)
    }

    /// The `java.sql.Types` id of the column
    pub fn sql_type(&self, idx: usize) -> Option<i32> {
        self.column_type_name(idx).map(sql_type)
    }
}

fn is_signed(type_name: &str) -> bool {
    let lower = type_name.to_ascii_lowercase();
    let base = lower.strip_prefix("multi_").unwrap_or(&lower);

    matches!(
        base,
        "int8" | "int16" | "int32" | "int64" | "float" | "double"
    )
}

fn sql_type(type_name: &str) -> i32 {
    let lower = type_name.to_ascii_lowercase();
    if lower.starts_with("multi_") {
        return 12;
    }

    match lower.as_str() {
        "int8" => -6,
        "int16" => 5,
        "int32" => 4,
        "int64" => -5,
        "float" => 6,
        "double" => 8,
        "string" => 12,
        _ => 0,
    }
}
