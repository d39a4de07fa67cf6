use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad categories of driver failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    BuildResultSet,
    ConnectionPool,
    BuildRequest,
    EmptyParam,
    InvalidParam,
    InsertFail,
    Unsupported,
    Remote,
}

impl ErrorType {
    pub fn code(&self) -> i64 {
        match self {
            ErrorType::BuildResultSet => 1,
            ErrorType::ConnectionPool => 2,
            ErrorType::BuildRequest => 3,
            ErrorType::EmptyParam => 4,
            ErrorType::InvalidParam => 5,
            ErrorType::InsertFail => 6,
            ErrorType::Unsupported => 7,
            ErrorType::Remote => 8,
        }
    }
}

/// Catalogue of driver error codes
///
/// The numeric code is `type * 1000 + code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    FailToConvertColumnType,
    ConnectionSizeExceededLimit,
    InputSchemaNull,
    EmptyParam,
    InvalidParam,
    InsertFail,
    Unsupported,
    RemoteProtocol,
}

impl ErrorCode {
    pub fn error_type(&self) -> ErrorType {
        match self {
            ErrorCode::FailToConvertColumnType => ErrorType::BuildResultSet,
            ErrorCode::ConnectionSizeExceededLimit => ErrorType::ConnectionPool,
            ErrorCode::InputSchemaNull => ErrorType::BuildRequest,
            ErrorCode::EmptyParam => ErrorType::EmptyParam,
            ErrorCode::InvalidParam => ErrorType::InvalidParam,
            ErrorCode::InsertFail => ErrorType::InsertFail,
            ErrorCode::Unsupported => ErrorType::Unsupported,
            ErrorCode::RemoteProtocol => ErrorType::Remote,
        }
    }

    fn sub_code(&self) -> i64 {
        match self {
            ErrorCode::FailToConvertColumnType => 1,
            ErrorCode::ConnectionSizeExceededLimit => 2,
            ErrorCode::InputSchemaNull => 3,
            ErrorCode::EmptyParam => 4,
            ErrorCode::InvalidParam => 5,
            ErrorCode::InsertFail => 6,
            ErrorCode::Unsupported => 7,
            ErrorCode::RemoteProtocol => 8,
        }
    }

    /// The numeric code reported to callers
    pub fn code(&self) -> i64 {
        self.error_type().code() * 1000 + self.sub_code()
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::FailToConvertColumnType => "fail to convert column type",
            ErrorCode::ConnectionSizeExceededLimit => "connection size exceeded limit",
            ErrorCode::InputSchemaNull => "input schema is null",
            ErrorCode::EmptyParam => "empty param",
            ErrorCode::InvalidParam => "invalid param",
            ErrorCode::InsertFail => "insert fail",
            ErrorCode::Unsupported => "unsupported operation",
            ErrorCode::RemoteProtocol => "remote protocol error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ErrorCode[code:{},description:{}]",
            self.code(),
            self.description()
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_error_code_numbering() {
        assert_eq!(ErrorCode::FailToConvertColumnType.code(), 1001);
        assert_eq!(ErrorCode::ConnectionSizeExceededLimit.code(), 2002);
        assert_eq!(ErrorCode::InputSchemaNull.code(), 3003);
        assert_eq!(ErrorCode::EmptyParam.code(), 4004);
        assert_eq!(ErrorCode::InvalidParam.code(), 5005);
        assert_eq!(ErrorCode::InsertFail.code(), 6006);
        assert_eq!(ErrorCode::Unsupported.code(), 7007);
        assert_eq!(ErrorCode::RemoteProtocol.code(), 8008);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(
            ErrorCode::EmptyParam.to_string(),
            "ErrorCode[code:4004,description:empty param]"
        );
    }
}
