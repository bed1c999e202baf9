use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Failure taxonomy surfaced to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    /// Rejected locally before any request was sent.
    Validation,
    /// The service already holds a product with the submitted name.
    Duplicate,
    BadRequest,
    Unauthorized,
    /// No response was received.
    Network,
    Unknown,
}

impl ErrorCategory {
    /// Whether failures in this category become a user-facing notification.
    /// Validation problems attach to their form fields instead.
    pub fn notifies(self) -> bool {
        !matches!(self, ErrorCategory::Validation)
    }
}

/// Error body the product service returns alongside non-2xx statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerErrorBody {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub field_errors: Option<BTreeMap<String, String>>,
}

impl ServerErrorBody {
    /// The server-supplied message, if it carries any text.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}
