//! Error types for hostlink
//!
//! Every failure the SDK can surface, whether returned synchronously at the
//! call boundary or delivered later through a pending call, is an [`SdkError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::messaging::TransportError;

/// Stable error codes shared with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ErrorCode {
    NotSupportedOnPlatform,
    FileNotFound,
    InternalError,
    NotSupportedInCurrentContext,
    PermissionDenied,
    NetworkError,
    NoHwSupport,
    InvalidArguments,
    UnauthorizedUserOperation,
    InsufficientResources,
    Throttle,
    UserAbort,
    OperationTimedOut,
    OldPlatform,
    SizeExceeded,
}

impl ErrorCode {
    /// Numeric value sent over the wire.
    pub fn as_u32(self) -> u32 {
        match self {
            ErrorCode::NotSupportedOnPlatform => 100,
            ErrorCode::FileNotFound => 404,
            ErrorCode::InternalError => 500,
            ErrorCode::NotSupportedInCurrentContext => 501,
            ErrorCode::PermissionDenied => 1000,
            ErrorCode::NetworkError => 2000,
            ErrorCode::NoHwSupport => 3000,
            ErrorCode::InvalidArguments => 4000,
            ErrorCode::UnauthorizedUserOperation => 5000,
            ErrorCode::InsufficientResources => 6000,
            ErrorCode::Throttle => 7000,
            ErrorCode::UserAbort => 8000,
            ErrorCode::OperationTimedOut => 8001,
            ErrorCode::OldPlatform => 9000,
            ErrorCode::SizeExceeded => 10000,
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.as_u32()
    }
}

impl TryFrom<u32> for ErrorCode {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let code = match value {
            100 => ErrorCode::NotSupportedOnPlatform,
            404 => ErrorCode::FileNotFound,
            500 => ErrorCode::InternalError,
            501 => ErrorCode::NotSupportedInCurrentContext,
            1000 => ErrorCode::PermissionDenied,
            2000 => ErrorCode::NetworkError,
            3000 => ErrorCode::NoHwSupport,
            4000 => ErrorCode::InvalidArguments,
            5000 => ErrorCode::UnauthorizedUserOperation,
            6000 => ErrorCode::InsufficientResources,
            7000 => ErrorCode::Throttle,
            8000 => ErrorCode::UserAbort,
            8001 => ErrorCode::OperationTimedOut,
            9000 => ErrorCode::OldPlatform,
            10000 => ErrorCode::SizeExceeded,
            other => return Err(format!("unknown error code {}", other)),
        };
        Ok(code)
    }
}

/// Structured error object exchanged with the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkErrorPayload {
    pub error_code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Errors that can occur in hostlink.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Any call made before initialization completed.
    #[error("The library has not yet been initialized")]
    NotInitialized,

    #[error("The library has already been initialized")]
    AlreadyInitialized,

    /// Call made from a frame context outside the allow-list.
    ///
    /// `allowed` holds the allow-list serialized as a JSON array.
    #[error("This call is only allowed in following contexts: {allowed}. Current context: \"{current}\".")]
    Context { allowed: String, current: String },

    #[error("Capability '{capability}' is not supported on this platform")]
    NotSupported { capability: String },

    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Error payload reported by the host, passed through untouched.
    #[error("Host reported an error: {0}")]
    Host(Value),

    #[error("The session was torn down before a response arrived")]
    TornDown,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid runtime config: {0}")]
    InvalidRuntimeConfig(String),

    #[error("Malformed initialize response: {0}")]
    Handshake(String),

    #[error("Malformed host response: {0}")]
    Response(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl SdkError {
    pub fn not_supported(capability: impl Into<String>) -> Self {
        SdkError::NotSupported {
            capability: capability.into(),
        }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        SdkError::InvalidArguments {
            message: message.into(),
        }
    }

    /// The stable error code for this error, when it has one.
    ///
    /// Host payloads report the `errorCode` field they carry, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            SdkError::NotSupported { .. } => Some(ErrorCode::NotSupportedOnPlatform),
            SdkError::InvalidArguments { .. } => Some(ErrorCode::InvalidArguments),
            SdkError::Response(_) => Some(ErrorCode::InternalError),
            SdkError::Host(payload) => payload
                .get("errorCode")
                .and_then(Value::as_u64)
                .and_then(|code| u32::try_from(code).ok())
                .and_then(|code| ErrorCode::try_from(code).ok()),
            _ => None,
        }
    }

    /// Convert to the structured error object, when the error has a code.
    pub fn to_payload(&self) -> Option<SdkErrorPayload> {
        let error_code = self.code()?;
        let message = match self {
            SdkError::InvalidArguments { message } => Some(message.clone()),
            SdkError::Host(payload) => payload
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };
        Some(SdkErrorPayload {
            error_code,
            message,
        })
    }
}

/// Result type alias for hostlink operations
pub type SdkResult<T> = Result<T, SdkError>;
