use serde::{Deserialize, Serialize};

pub mod auth;
pub mod catalog;

/// Standard response wrapper: `{ "status": ..., "message": ..., "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: T,
}

impl<T> Envelope<T> {
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: None, message: None, data }
    }

    /// Whether the backend reported the operation as successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}
