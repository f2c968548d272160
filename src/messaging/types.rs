//! Message envelope definitions for host communication.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SdkError, SdkResult};

/// Identifier linking an outbound request to its response.
pub type CorrelationId = u64;

/// Message sent from the app to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Present for correlated requests, absent for fire-and-forget posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
    pub func: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Message received from the host.
///
/// Responses carry the `id` of the request they answer; unsolicited events
/// carry no `id` and are routed by `func`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<String>,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl InboundMessage {
    /// A response to the request with `id`.
    pub fn response(id: CorrelationId, args: Vec<Value>) -> Self {
        Self {
            id: Some(id),
            func: None,
            args,
        }
    }

    /// An unsolicited event addressed to the handler registered under `func`.
    pub fn event(func: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: None,
            func: Some(func.into()),
            args,
        }
    }
}

/// How the arguments of a response are turned into a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseConvention {
    /// `[error, ...values]`: a present, non-null first argument is a host error,
    /// otherwise the remaining arguments are the success values.
    #[default]
    ErrorFirst,
    /// Arguments are delivered as-is.
    Raw,
}

impl ResponseConvention {
    pub(crate) fn interpret(self, args: Vec<Value>) -> SdkResult<Vec<Value>> {
        match self {
            ResponseConvention::Raw => Ok(args),
            ResponseConvention::ErrorFirst => {
                let mut args = args.into_iter();
                match args.next() {
                    Some(error) if !error.is_null() => Err(SdkError::Host(error)),
                    _ => Ok(args.collect()),
                }
            }
        }
    }
}

/// Decode the first success value of a response.
pub fn decode_first<T: DeserializeOwned>(args: Vec<Value>) -> SdkResult<T> {
    let value = args
        .into_iter()
        .next()
        .ok_or_else(|| SdkError::Response("response carried no value".to_string()))?;
    serde_json::from_value(value).map_err(|e| SdkError::Response(e.to_string()))
}
