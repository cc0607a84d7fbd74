//! # Notifier Errors
//!
//! Error taxonomy shared by every service mounted in the notifier daemon.
//!
//! Every request-time failure is a [`ServiceError`]. Each variant maps onto a
//! stable JSON-RPC error code so that thin clients can tell "you asked wrong"
//! apart from "that does not exist", "that matched more than one thing" and
//! "the user dismissed the prompt".

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Stable error codes reported on the wire.
pub mod code {
    /// Malformed or contradictory parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// No such service or method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Delegate, filesystem or OS failure.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// The request body could not be parsed.
    pub const PARSE_ERROR: i32 = -32700;
    /// The request envelope was not a valid request.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The request ran past its deadline.
    pub const REQUEST_TIMEOUT: i32 = -32001;
    /// The user dismissed an interactive prompt.
    pub const USER_CANCELLED: i32 = -29999;
    /// A referenced resource does not exist.
    pub const RESOURCE_NOT_FOUND: i32 = -29998;
    /// More than one resource matched where exactly one was required.
    pub const AMBIGUOUS_RESULT: i32 = -29997;
    /// The authorization hook rejected the request.
    pub const UNAUTHORIZED: i32 = -29996;
}

/// Request-time errors returned by service handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("method not found: {method}")]
    MethodNotFound { method: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("ambiguous result: {message}")]
    Ambiguous { message: String },

    #[error("user cancelled request")]
    Cancelled,

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("{context}: {reason}")]
    Internal { context: String, reason: String },
}

impl ServiceError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn ambiguous(message: impl Into<String>) -> Self {
        Self::Ambiguous {
            message: message.into(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Wraps a delegate failure together with what was being attempted
    /// (which path, which tag, which program).
    pub fn internal(context: impl Into<String>, reason: impl Display) -> Self {
        Self::Internal {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the wire error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidRequest { .. } => code::INVALID_PARAMS,
            Self::MethodNotFound { .. } => code::METHOD_NOT_FOUND,
            Self::NotFound { .. } => code::RESOURCE_NOT_FOUND,
            Self::Ambiguous { .. } => code::AMBIGUOUS_RESULT,
            Self::Cancelled => code::USER_CANCELLED,
            Self::Unauthorized { .. } => code::UNAUTHORIZED,
            Self::Timeout { .. } => code::REQUEST_TIMEOUT,
            Self::Internal { .. } => code::INTERNAL_ERROR,
        }
    }

    /// Reports whether the caller is at fault, as opposed to the server or
    /// one of its delegates.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::MethodNotFound { .. }
                | Self::NotFound { .. }
                | Self::Ambiguous { .. }
                | Self::Unauthorized { .. }
        )
    }

    /// Converts the error into its wire representation.
    pub fn to_object(&self) -> ErrorObject {
        if let Self::Internal { .. } = self {
            tracing::debug!(error = %self, "Reporting internal error to caller");
        }
        ErrorObject {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }
}

/// Wire form of an error: the JSON-RPC `error` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorObject {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Attaches context to delegate failures, turning them into
/// [`ServiceError::Internal`].
pub trait ResultExt<T> {
    fn internal(self, context: impl Into<String>) -> Result<T, ServiceError>;
}

impl<T, E: Display> ResultExt<T> for Result<T, E> {
    fn internal(self, context: impl Into<String>) -> Result<T, ServiceError> {
        self.map_err(|e| ServiceError::internal(context, e))
    }
}
