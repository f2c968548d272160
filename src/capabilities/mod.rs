//! Capability adapters.
//!
//! Each public call runs the same checks before anything is sent:
//! initialized, allowed frame context, supported capability, then its own
//! argument validation. A failing check returns an error and posts nothing.

pub mod dialog;
pub mod location;

use serde::Serialize;
use serde_json::Value;

use crate::error::{SdkError, SdkResult};

/// Serialize a capability argument for the wire.
pub(crate) fn to_arg<T: Serialize>(value: &T) -> SdkResult<Value> {
    serde_json::to_value(value).map_err(|e| SdkError::invalid_arguments(e.to_string()))
}

/// Reject an empty or whitespace-only string argument.
pub(crate) fn require_non_empty(field: &str, value: &str) -> SdkResult<()> {
    if value.trim().is_empty() {
        return Err(SdkError::invalid_arguments(format!("{} must not be empty", field)));
    }
    Ok(())
}
