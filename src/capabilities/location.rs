//! Device location.

use std::future::Future;

use serde::{Deserialize, Serialize};

use super::to_arg;
use crate::context::FrameContext;
use crate::error::{SdkError, SdkResult};
use crate::messaging::decode_first;
use crate::session::Session;

pub const CAPABILITY: &str = "location";

pub(crate) const GET_LOCATION: &str = "location.getLocation";
pub(crate) const SHOW_LOCATION: &str = "location.showLocation";

const ALLOWED: &[FrameContext] = &[FrameContext::Content, FrameContext::Task];

/// How the location should be obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationProps {
    /// Let the user pick a location instead of using the current one.
    pub allow_choose_location: bool,
    /// Show a map; ignored when choosing is allowed.
    pub show_map: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            timestamp: None,
        }
    }
}

/// Ask the host for a location.
///
/// The request is sent before this returns; the future resolves with the
/// host's answer.
pub fn get_location(
    session: &Session,
    props: Option<LocationProps>,
) -> SdkResult<impl Future<Output = SdkResult<Location>> + Send + 'static> {
    session.ensure_capability(ALLOWED, CAPABILITY)?;
    let props = props.ok_or_else(|| SdkError::invalid_arguments("location props are required"))?;

    let call = session.request(GET_LOCATION, vec![to_arg(&props)?])?;
    Ok(async move { decode_first(call.await?) })
}

/// Show a location on a map; resolves to whether the host displayed it.
pub fn show_location(
    session: &Session,
    location: Option<Location>,
) -> SdkResult<impl Future<Output = SdkResult<bool>> + Send + 'static> {
    session.ensure_capability(ALLOWED, CAPABILITY)?;
    let location = location.ok_or_else(|| SdkError::invalid_arguments("a location is required"))?;

    let call = session.request(SHOW_LOCATION, vec![to_arg(&location)?])?;
    Ok(async move { decode_first(call.await?) })
}
