//! Frame context model and the access-control guard.
//!
//! This module provides:
//! - `FrameContext` - where the embedded app is currently running
//! - `HostClientType` - which host platform is embedding it
//! - `ensure_context` - the allow-list check every restricted call runs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// The kind of host surface the app is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameContext {
    Settings,
    Content,
    Authentication,
    Remove,
    Task,
    SidePanel,
    Stage,
    MeetingStage,
}

impl FrameContext {
    /// Wire name of the context.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameContext::Settings => "settings",
            FrameContext::Content => "content",
            FrameContext::Authentication => "authentication",
            FrameContext::Remove => "remove",
            FrameContext::Task => "task",
            FrameContext::SidePanel => "sidePanel",
            FrameContext::Stage => "stage",
            FrameContext::MeetingStage => "meetingStage",
        }
    }
}

impl fmt::Display for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host platform identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostClientType {
    Desktop,
    Web,
    Android,
    Ios,
    Ipados,
    Macos,
    Rigel,
    SurfaceHub,
    TeamsRoomsWindows,
    TeamsRoomsAndroid,
    TeamsPhones,
    TeamsDisplays,
}

impl HostClientType {
    /// Every host type that shipped before self-describing runtime configs.
    pub const V1: [HostClientType; 11] = [
        HostClientType::Desktop,
        HostClientType::Web,
        HostClientType::Android,
        HostClientType::Ios,
        HostClientType::Ipados,
        HostClientType::Rigel,
        HostClientType::SurfaceHub,
        HostClientType::TeamsRoomsWindows,
        HostClientType::TeamsRoomsAndroid,
        HostClientType::TeamsPhones,
        HostClientType::TeamsDisplays,
    ];
}

/// Check that `current` is one of the `allowed` contexts.
///
/// The error carries the allow-list rendered as a JSON array in the order given,
/// followed by the observed context.
pub fn ensure_context(current: FrameContext, allowed: &[FrameContext]) -> SdkResult<()> {
    if allowed.contains(&current) {
        return Ok(());
    }

    Err(SdkError::Context {
        allowed: render_allow_list(allowed),
        current: current.as_str().to_string(),
    })
}

fn render_allow_list(allowed: &[FrameContext]) -> String {
    let names: Vec<String> = allowed
        .iter()
        .map(|ctx| format!("\"{}\"", ctx.as_str()))
        .collect();
    format!("[{}]", names.join(","))
}
