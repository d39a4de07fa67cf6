use ha3_core::data::{DataType, DataValue};
use enum_as_inner::EnumAsInner;
use serde::Serialize;

/// A query parameter
#[derive(Debug, Clone, PartialEq, Serialize, EnumAsInner)]
pub enum QueryParam {
    /// A placeholder bound by the caller before every execution
    Dynamic(DynamicParam),
    /// A literal lifted out of the statement text, immutable across executions
    Constant(DataValue),
}

/// A caller-bound query parameter slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DynamicParam {
    pub id: u32,
    pub r#type: DataType,
}

impl QueryParam {
    pub fn dynamic(id: u32, r#type: DataType) -> Self {
        Self::Dynamic(DynamicParam { id, r#type })
    }

    pub fn constant(param: DataValue) -> Self {
        Self::Constant(param)
    }

    /// Gets the type of the query parameter
    pub fn r#type(&self) -> DataType {
        match self {
            QueryParam::Dynamic(p) => p.r#type,
            QueryParam::Constant(v) => v.r#type(),
        }
    }
}
