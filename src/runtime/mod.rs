//! Runtime capability model.
//!
//! A [`Runtime`] describes which capabilities, and which sub-capabilities, the
//! current host supports. It is an immutable value: it is built once (parsed
//! from the host's declaration or synthesized by [`back_compat`]) and then shared
//! behind an `Arc`. Nothing can change a published runtime; publishing a new one
//! replaces the reference wholesale.
//!
//! # Support semantics
//!
//! ```text
//! { "dialog": {} }              dialog supported, dialog.update not
//! { "dialog": { "update": {} }} both supported
//! { "dialog": null }            dialog not supported
//! { }                           dialog not supported
//! ```

pub mod back_compat;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

pub use back_compat::{
    generate_back_compat_runtime, generate_back_compat_runtime_with, CapabilityRequirement,
    VersionThresholdTable,
};

/// A node in the capability tree.
///
/// Each key maps to `Some(subtree)` when supported (an empty subtree still
/// counts) or `None` when the host explicitly lists it as unsupported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityTree(BTreeMap<String, Option<CapabilityTree>>);

impl CapabilityTree {
    /// Create an empty tree (nothing supported).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a supported capability with the given sub-capabilities.
    pub fn with(mut self, name: &str, children: CapabilityTree) -> Self {
        self.0.insert(name.to_string(), Some(children));
        self
    }

    /// Add a supported capability with no sub-capabilities.
    pub fn with_leaf(self, name: &str) -> Self {
        self.with(name, CapabilityTree::new())
    }

    /// Add a key explicitly marked as unsupported.
    pub fn with_unsupported(mut self, name: &str) -> Self {
        self.0.insert(name.to_string(), None);
        self
    }

    /// Additive merge: `fragment` can add capabilities at any depth but never
    /// removes one that is already supported here.
    pub fn merged(mut self, fragment: &CapabilityTree) -> Self {
        self.merge_from(fragment);
        self
    }

    fn merge_from(&mut self, fragment: &CapabilityTree) {
        for (name, node) in &fragment.0 {
            if let (Some(Some(existing)), Some(children)) = (self.0.get_mut(name), node) {
                existing.merge_from(children);
                continue;
            }
            let already_supported = matches!(self.0.get(name), Some(Some(_)));
            if !(already_supported && node.is_none()) {
                self.0.insert(name.clone(), node.clone());
            }
        }
    }

    /// Look up a direct child; `None` when absent or unsupported.
    pub fn get(&self, name: &str) -> Option<&CapabilityTree> {
        self.0.get(name).and_then(Option::as_ref)
    }

    /// Names of the supported direct children.
    pub fn supported(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, node)| node.is_some())
            .map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the dotted `path` resolves to a supported node.
    pub fn is_supported(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let mut node = self;
        for segment in path.split('.') {
            match node.get(segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        true
    }
}

/// The capability registry published for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    api_version: u32,
    #[serde(default)]
    is_legacy_teams: bool,
    #[serde(default)]
    supports: CapabilityTree,
}

impl Runtime {
    pub fn new(api_version: u32, is_legacy_teams: bool, supports: CapabilityTree) -> Self {
        Self {
            api_version,
            is_legacy_teams,
            supports,
        }
    }

    /// Sentinel published while no session is initialized: nothing is supported.
    pub fn uninitialized() -> Self {
        Self::new(0, false, CapabilityTree::new())
    }

    /// Parse a host-declared runtime config.
    pub fn from_json(json: &str) -> SdkResult<Self> {
        serde_json::from_str(json).map_err(|e| SdkError::InvalidRuntimeConfig(e.to_string()))
    }

    pub fn to_json(&self) -> SdkResult<String> {
        serde_json::to_string(self).map_err(|e| SdkError::InvalidRuntimeConfig(e.to_string()))
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    /// True when this runtime was synthesized for a host without a declared config.
    pub fn is_legacy_teams(&self) -> bool {
        self.is_legacy_teams
    }

    pub fn supports(&self) -> &CapabilityTree {
        &self.supports
    }

    /// Whether a capability (`"dialog"`) or sub-capability (`"dialog.update"`)
    /// is supported. Never fails; unknown paths are simply unsupported.
    pub fn is_supported(&self, path: &str) -> bool {
        self.supports.is_supported(path)
    }
}
