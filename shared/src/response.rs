use serde::{Deserialize, Serialize};

/// Result envelope returned by every mutating endpoint of the current API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResult {
    /// 0 on success, 1 on failure
    pub code: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResult {
    pub fn success() -> Self {
        Self { code: 0, error: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            code: 1,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Error body of the deprecated API, carried with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemBody {
    pub title: String,
    pub status: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ProblemDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetail {
    pub message: String,

    /// Where the problem is, e.g. "query.serial"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}
