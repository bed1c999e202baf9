//! Failure classification and display messages.

use std::fmt;

use shared::error::{ErrorCategory, ServerErrorBody};
use thiserror::Error;

use crate::transport::ApiFailure;

/// Controller operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
    CheckStock,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::CheckStock => "check_stock",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to fetch products",
            Operation::Get => "Failed to load product",
            Operation::Create => "Failed to create product",
            Operation::Update => "Failed to update product",
            Operation::Delete => "Failed to delete product",
            Operation::CheckStock => "Failed to check stock availability",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Problem with a single input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A failure mapped onto the taxonomy, with the text to show for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed ({category:?}): {message}")]
pub struct ClassifiedError {
    category: ErrorCategory,
    operation: Operation,
    message: String,
    field_errors: Vec<FieldError>,
}

impl ClassifiedError {
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    /// A 401 invalidates the whole session, not just this request.
    pub fn requires_reauth(&self) -> bool {
        self.category == ErrorCategory::Unauthorized
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(&self, operation: Operation, failure: &ApiFailure) -> ClassifiedError {
        match failure {
            ApiFailure::Network(_) => self.build(ErrorCategory::Network, operation, None, Vec::new()),
            ApiFailure::Decode(_) => self.build(ErrorCategory::Unknown, operation, None, Vec::new()),
            ApiFailure::Status { status, body } => {
                let body = body.as_ref();
                let category = category_for_status(*status, body);
                let field_errors = body
                    .and_then(|body| body.field_errors.as_ref())
                    .map(|fields| {
                        fields
                            .iter()
                            .map(|(field, message)| FieldError::new(field, message))
                            .collect()
                    })
                    .unwrap_or_default();
                self.build(
                    category,
                    operation,
                    body.and_then(ServerErrorBody::message),
                    field_errors,
                )
            }
        }
    }

    /// Local draft problems; these never reach the network or the notifier.
    pub fn validation(&self, operation: Operation, field_errors: Vec<FieldError>) -> ClassifiedError {
        self.build(ErrorCategory::Validation, operation, None, field_errors)
    }

    /// A response the controller refuses to apply even though the call succeeded.
    pub fn malformed(&self, operation: Operation) -> ClassifiedError {
        self.build(ErrorCategory::Unknown, operation, None, Vec::new())
    }

    pub fn default_message(category: ErrorCategory, operation: Operation) -> &'static str {
        match category {
            ErrorCategory::Validation => "Please correct the highlighted fields.",
            ErrorCategory::Duplicate => "A product with this name already exists.",
            ErrorCategory::BadRequest => "The server rejected the submitted data.",
            ErrorCategory::Unauthorized => "Your session has expired. Please sign in again.",
            ErrorCategory::Network => {
                "Unable to reach the server. Check your connection and retry."
            }
            ErrorCategory::Unknown => operation.failure_message(),
        }
    }

    fn build(
        &self,
        category: ErrorCategory,
        operation: Operation,
        server_message: Option<&str>,
        field_errors: Vec<FieldError>,
    ) -> ClassifiedError {
        let message = server_message
            .map(str::to_string)
            .unwrap_or_else(|| Self::default_message(category, operation).to_string());
        ClassifiedError {
            category,
            operation,
            message,
            field_errors,
        }
    }
}

fn category_for_status(status: u16, body: Option<&ServerErrorBody>) -> ErrorCategory {
    match status {
        401 => ErrorCategory::Unauthorized,
        409 => ErrorCategory::Duplicate,
        // Create wraps conflicts in a plain 400 on some service paths.
        400 | 422 if mentions_existing_name(body) => ErrorCategory::Duplicate,
        400 | 422 => ErrorCategory::BadRequest,
        _ => ErrorCategory::Unknown,
    }
}

fn mentions_existing_name(body: Option<&ServerErrorBody>) -> bool {
    body.and_then(ServerErrorBody::message)
        .map(|message| message.to_ascii_lowercase().contains("already exists"))
        .unwrap_or(false)
}
