use serde::{Deserialize, Serialize};

/// Error details reported alongside a query result
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "errorCode", default)]
    pub error_code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error: String,
}

impl ErrorInfo {
    pub fn new(error_code: i64, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
            error: error.into(),
        }
    }

    /// A zero code means success
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }
}
