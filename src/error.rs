//! Error taxonomy shared by every checkout step.
//!
//! Errors fall into four families: client-side validation, client-side file checks,
//! gateway failures (4xx, 5xx, network, malformed payloads) and local storage failures.
//! [`PortalError`] wraps them all and knows how to turn itself into the text shown to the
//! user through [`report`].

use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::error;

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Failures produced by the remote service gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP {status}: {message}")]
    Client {
        status: u16,
        code: Option<String>,
        message: String,
        data: Option<Value>,
    },

    #[error("HTTP {status}: {message}")]
    Server {
        status: u16,
        code: Option<String>,
        message: String,
        data: Option<Value>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response format: {reason}")]
    InvalidResponse { reason: String },

    /// The request could not be addressed; nothing was sent.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl GatewayError {
    /// Builds a client or server error from an HTTP status.
    pub fn from_status(
        status: u16,
        code: Option<String>,
        message: String,
        data: Option<Value>,
    ) -> Self {
        if status >= 500 {
            GatewayError::Server { status, code, message, data }
        } else {
            GatewayError::Client { status, code, message, data }
        }
    }

    /// Only connectivity failures and 5xx responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Server { .. } | GatewayError::Network(_))
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Client { status, .. } | GatewayError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Client { code, .. } | GatewayError::Server { code, .. } => {
                code.as_deref()
            }
            _ => None,
        }
    }
}

/// The part of a form that owns a failing field. Front ends expand this section when
/// validation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSection {
    /// Zero-based index into the item list.
    Item(usize),
    Route,
    Sender,
    Receiver,
    Pickup,
    Payer,
    Tracking,
}

impl fmt::Display for FormSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormSection::Item(index) => write!(f, "item {}", index + 1),
            FormSection::Route => write!(f, "route"),
            FormSection::Sender => write!(f, "sender"),
            FormSection::Receiver => write!(f, "receiver"),
            FormSection::Pickup => write!(f, "pickup"),
            FormSection::Payer => write!(f, "payer"),
            FormSection::Tracking => write!(f, "tracking"),
        }
    }
}

/// A client-detected problem with a single field. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub section: FormSection,
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(section: FormSection, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            section,
            field,
            message: message.into(),
        }
    }
}

/// Rejections of a payment proof file, raised before any upload call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileValidationError {
    #[error("File size must be less than 5MB")]
    TooLarge { size: u64, max: u64 },

    #[error("Please upload a JPG, PNG, or PDF file")]
    UnsupportedType { mime: String },

    #[error("Please select a file to upload")]
    Missing,
}

/// Local draft store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Umbrella error returned by the checkout steps.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    File(#[from] FileValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Quote {quote_id} has expired")]
    QuoteExpired { quote_id: String },

    /// A step was entered without the data an earlier step is expected to leave behind.
    #[error("{0}")]
    Workflow(String),
}

impl PortalError {
    pub fn workflow(message: impl Into<String>) -> Self {
        PortalError::Workflow(message.into())
    }

    /// Text suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Validation(err) => err.message.clone(),
            PortalError::File(err) => err.to_string(),
            PortalError::Gateway(err) => gateway_message(err),
            PortalError::Store(_) => GENERIC_ERROR_MESSAGE.to_string(),
            PortalError::QuoteExpired { .. } => message_for_code("QUOTE_EXPIRED")
                .unwrap_or(GENERIC_ERROR_MESSAGE)
                .to_string(),
            PortalError::Workflow(message) => message.clone(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PortalError::Validation(_) => "validation",
            PortalError::File(_) => "file_validation",
            PortalError::Gateway(GatewayError::Client { .. }) => "client",
            PortalError::Gateway(GatewayError::Server { .. }) => "server",
            PortalError::Gateway(GatewayError::Network(_)) => "network",
            PortalError::Gateway(GatewayError::InvalidResponse { .. }) => "invalid_response",
            PortalError::Gateway(GatewayError::InvalidRequest { .. }) => "invalid_request",
            PortalError::Store(_) => "store",
            PortalError::QuoteExpired { .. } => "quote_expired",
            PortalError::Workflow(_) => "workflow",
        }
    }
}

fn gateway_message(err: &GatewayError) -> String {
    if let Some(text) = err.code().and_then(message_for_code) {
        return text.to_string();
    }

    match err {
        GatewayError::Client { message, .. } => message.clone(),
        GatewayError::Server { code: Some(_), message, .. } => message.clone(),
        GatewayError::Server { code: None, .. } => message_for_code("SERVER_ERROR")
            .unwrap_or(GENERIC_ERROR_MESSAGE)
            .to_string(),
        GatewayError::Network(_) => message_for_code("NETWORK_ERROR")
            .unwrap_or(GENERIC_ERROR_MESSAGE)
            .to_string(),
        GatewayError::InvalidResponse { .. } | GatewayError::InvalidRequest { .. } => {
            GENERIC_ERROR_MESSAGE.to_string()
        }
    }
}

/// Known business error codes and their user-facing text.
pub fn message_for_code(code: &str) -> Option<&'static str> {
    let message = match code {
        "QUOTE_PRICE_CHANGED" => "The quote price has changed. Please review the new prices.",
        "QUOTE_EXPIRED" => "This quote has expired. Please fetch new quotes.",
        "INVALID_PAYMENT_METHOD" => "The selected payment method is not valid.",
        "PAYMENT_EXPIRED" => "Your payment session has expired. Please try again.",
        "FILE_TOO_LARGE" => "File size exceeds the maximum limit of 5MB.",
        "INVALID_FILE_TYPE" => "Invalid file type. Please upload PDF, PNG, or JPEG files only.",
        "INSUFFICIENT_BALANCE" => {
            "Insufficient wallet balance. Please select a different payment method."
        }
        "AUTHENTICATION_ERROR" => "Your session has expired. Please log in again.",
        "FORBIDDEN" => "You don't have permission to perform this action.",
        "NOT_FOUND" => "The requested resource was not found.",
        "SERVER_ERROR" => "A server error occurred. Please try again later.",
        "NETWORK_ERROR" => "Network error. Please check your internet connection.",
        _ => return None,
    };

    Some(message)
}

/// Logs the error for diagnostics and returns the message to surface.
pub fn report(err: &PortalError) -> String {
    match err {
        PortalError::Gateway(gateway) => error!(
            kind = err.kind(),
            status = gateway.status_code(),
            code = gateway.code(),
            error = %err,
            "request failed"
        ),
        _ => error!(kind = err.kind(), error = %err, "step failed"),
    }

    err.user_message()
}
