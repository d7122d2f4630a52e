use serde::{Deserialize, Serialize};

/// Uniform error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorResponse {
            error: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AttachTag {
    pub tag_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AttachRamo {
    pub ramo_id: i64,
}

/// Body for creating a tag or a ramo in one of the catalogs.
#[derive(Debug, Deserialize)]
pub struct NamePayload {
    pub name: String,
}
