use std::fmt;

use super::{Error, ErrorCode};

/// A categorised failure raised by the driver itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    code: ErrorCode,
    msg: String,
}

impl DriverError {
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
        }
    }

    pub fn empty_param(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::EmptyParam, msg)
    }

    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParam, msg)
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unsupported, msg)
    }

    pub fn pool_exhausted(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConnectionSizeExceededLimit, msg)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    /// Finds the driver error code anywhere in the chain of the supplied error
    pub fn code_of(err: &Error) -> Option<ErrorCode> {
        err.chain()
            .find_map(|e| e.downcast_ref::<DriverError>())
            .map(|e| e.code)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},msg:{}", self.code, self.msg)
    }
}

impl std::error::Error for DriverError {}
