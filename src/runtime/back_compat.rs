//! Runtime synthesis for hosts that predate self-describing runtime configs.
//!
//! Such hosts only report the highest SDK version they support. The runtime is
//! rebuilt from a fixed legacy baseline plus every version threshold the host
//! has reached, filtered by host client type.

use once_cell::sync::Lazy;

use crate::context::HostClientType;
use crate::version::is_at_least;

use super::{CapabilityTree, Runtime};

/// API version stamped on every synthesized runtime.
const LEGACY_API_VERSION: u32 = 1;

/// Capabilities unlocked by a version threshold, restricted to some host types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRequirement {
    pub capability: CapabilityTree,
    pub host_client_types: Vec<HostClientType>,
}

impl CapabilityRequirement {
    pub fn new(capability: CapabilityTree, host_client_types: &[HostClientType]) -> Self {
        Self {
            capability,
            host_client_types: host_client_types.to_vec(),
        }
    }

    fn applies_to(&self, host_client_type: HostClientType) -> bool {
        self.host_client_types.contains(&host_client_type)
    }
}

/// Version key → requirements unlocked at or above that version.
///
/// Thresholds keep their insertion order; synthesis evaluates every one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionThresholdTable {
    thresholds: Vec<(String, Vec<CapabilityRequirement>)>,
}

impl VersionThresholdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add requirements under a version key, appending if the key already exists.
    pub fn with_threshold(mut self, version: &str, requirements: Vec<CapabilityRequirement>) -> Self {
        match self.thresholds.iter_mut().find(|(key, _)| key == version) {
            Some((_, existing)) => existing.extend(requirements),
            None => self.thresholds.push((version.to_string(), requirements)),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CapabilityRequirement])> {
        self.thresholds
            .iter()
            .map(|(version, reqs)| (version.as_str(), reqs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

/// The capability set every pre-config host is known to support.
pub static LEGACY_BASELINE: Lazy<Runtime> = Lazy::new(|| {
    let leaf = CapabilityTree::new;
    let supports = CapabilityTree::new()
        .with_leaf("appInstallDialog")
        .with_leaf("appEntity")
        .with_leaf("call")
        .with_leaf("chat")
        .with_leaf("conversations")
        .with("dialog", leaf().with_leaf("bot").with_leaf("update"))
        .with_leaf("interactive")
        .with_leaf("logs")
        .with_leaf("meetingRoom")
        .with_leaf("menus")
        .with_leaf("monetization")
        .with_leaf("notifications")
        .with(
            "pages",
            leaf()
                .with_leaf("appButton")
                .with_leaf("backStack")
                .with_leaf("config")
                .with_leaf("currentApp")
                .with_leaf("fullTrust")
                .with_leaf("tabs"),
        )
        .with_leaf("remoteCamera")
        .with_leaf("stageView")
        .with("teams", leaf().with_leaf("fullTrust"))
        .with_leaf("teamsCore")
        .with_leaf("video");
    Runtime::new(LEGACY_API_VERSION, true, supports)
});

/// Capabilities added to the legacy baseline as hosts reached newer versions.
pub static VERSION_THRESHOLDS: Lazy<VersionThresholdTable> = Lazy::new(|| {
    use HostClientType::*;

    VersionThresholdTable::new()
        .with_threshold(
            "1.9.0",
            vec![CapabilityRequirement::new(
                CapabilityTree::new().with_leaf("location"),
                &HostClientType::V1,
            )],
        )
        .with_threshold(
            "2.0.0",
            vec![
                CapabilityRequirement::new(
                    CapabilityTree::new().with_leaf("people"),
                    &HostClientType::V1,
                ),
                CapabilityRequirement::new(CapabilityTree::new().with_leaf("sharing"), &[Web]),
            ],
        )
        .with_threshold(
            "2.0.1",
            vec![CapabilityRequirement::new(
                CapabilityTree::new().with(
                    "teams",
                    CapabilityTree::new()
                        .with("fullTrust", CapabilityTree::new().with_leaf("joinedTeams")),
                ),
                &[
                    Android,
                    Desktop,
                    Ios,
                    TeamsRoomsAndroid,
                    TeamsPhones,
                    TeamsDisplays,
                    Web,
                ],
            )],
        )
        .with_threshold(
            "2.0.5",
            vec![CapabilityRequirement::new(
                CapabilityTree::new().with_leaf("webStorage"),
                &[Desktop],
            )],
        )
});

/// Synthesize a runtime from the built-in baseline and threshold table.
pub fn generate_back_compat_runtime(
    highest_supported_version: &str,
    host_client_type: HostClientType,
) -> Runtime {
    generate_back_compat_runtime_with(
        &LEGACY_BASELINE,
        &VERSION_THRESHOLDS,
        highest_supported_version,
        host_client_type,
    )
}

/// Synthesize a runtime from an explicit baseline and threshold table.
///
/// Merges are additive, so threshold order never matters for the result.
pub fn generate_back_compat_runtime_with(
    baseline: &Runtime,
    table: &VersionThresholdTable,
    highest_supported_version: &str,
    host_client_type: HostClientType,
) -> Runtime {
    let mut supports = baseline.supports().clone();

    for (threshold, requirements) in table.iter() {
        if !is_at_least(highest_supported_version, threshold) {
            continue;
        }
        for requirement in requirements {
            if requirement.applies_to(host_client_type) {
                tracing::debug!(
                    threshold,
                    host = ?host_client_type,
                    "Applying back-compat capability threshold"
                );
                supports = supports.merged(&requirement.capability);
            }
        }
    }

    Runtime::new(LEGACY_API_VERSION, true, supports)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_table(host_types: &[HostClientType], c2_hosts: &[HostClientType]) -> VersionThresholdTable {
        VersionThresholdTable::new()
            .with_threshold(
                "1.9.0",
                vec![CapabilityRequirement::new(
                    CapabilityTree::new().with_leaf("c1"),
                    host_types,
                )],
            )
            .with_threshold(
                "2.0.0",
                vec![CapabilityRequirement::new(
                    CapabilityTree::new().with_leaf("c2"),
                    c2_hosts,
                )],
            )
    }

    fn empty_baseline() -> Runtime {
        Runtime::new(1, true, CapabilityTree::new())
    }

    #[test]
    fn test_threshold_scenarios() {
        let host = HostClientType::Desktop;
        let table = two_step_table(&[host], &[host]);
        let baseline = empty_baseline();

        let at_19 = generate_back_compat_runtime_with(&baseline, &table, "1.9.0", host);
        assert!(at_19.is_supported("c1"));
        assert!(!at_19.is_supported("c2"));

        let at_20 = generate_back_compat_runtime_with(&baseline, &table, "2.0.0", host);
        assert!(at_20.is_supported("c1"));
        assert!(at_20.is_supported("c2"));

        let at_15 = generate_back_compat_runtime_with(&baseline, &table, "1.5.0", host);
        assert!(!at_15.is_supported("c1"));
        assert!(!at_15.is_supported("c2"));
    }

    #[test]
    fn test_host_type_filter() {
        let table = two_step_table(
            &[HostClientType::Desktop, HostClientType::Web],
            &[HostClientType::Web],
        );
        let runtime =
            generate_back_compat_runtime_with(&empty_baseline(), &table, "2.0.0", HostClientType::Desktop);
        assert!(runtime.is_supported("c1"));
        assert!(!runtime.is_supported("c2"));
    }

    #[test]
    fn test_uncovered_host_type_never_gains_capabilities() {
        let runtime = generate_back_compat_runtime("99.0.0", HostClientType::Macos);
        assert_eq!(runtime.supports(), LEGACY_BASELINE.supports());
    }

    #[test]
    fn test_threshold_order_does_not_matter() {
        let host = HostClientType::Web;
        let reversed = VersionThresholdTable::new()
            .with_threshold(
                "2.0.0",
                vec![CapabilityRequirement::new(CapabilityTree::new().with_leaf("c2"), &[host])],
            )
            .with_threshold(
                "1.9.0",
                vec![CapabilityRequirement::new(CapabilityTree::new().with_leaf("c1"), &[host])],
            );
        let runtime = generate_back_compat_runtime_with(&empty_baseline(), &reversed, "2.0.0", host);
        assert!(runtime.is_supported("c1"));
        assert!(runtime.is_supported("c2"));
    }

    #[test]
    fn test_lower_threshold_listed_later_keeps_deeper_capability() {
        let host = HostClientType::Desktop;
        let table = VersionThresholdTable::new()
            .with_threshold(
                "2.0.1",
                vec![CapabilityRequirement::new(
                    CapabilityTree::new().with(
                        "teams",
                        CapabilityTree::new()
                            .with("fullTrust", CapabilityTree::new().with_leaf("joinedTeams")),
                    ),
                    &[host],
                )],
            )
            .with_threshold(
                "1.0.0",
                vec![CapabilityRequirement::new(
                    CapabilityTree::new().with("teams", CapabilityTree::new().with_leaf("fullTrust")),
                    &[host],
                )],
            );

        let runtime = generate_back_compat_runtime_with(&empty_baseline(), &table, "2.0.1", host);
        assert!(runtime.is_supported("teams.fullTrust"));
        assert!(runtime.is_supported("teams.fullTrust.joinedTeams"));
    }

    #[test]
    fn test_synthesized_runtime_is_tagged_legacy() {
        let runtime = generate_back_compat_runtime("1.0.0", HostClientType::Desktop);
        assert!(runtime.is_legacy_teams());
        assert_eq!(runtime.api_version(), 1);
        assert!(runtime.is_supported("dialog.update"));
        assert!(!runtime.is_supported("location"));
    }

    #[test]
    fn test_builtin_table() {
        let web = generate_back_compat_runtime("2.0.0", HostClientType::Web);
        assert!(web.is_supported("location"));
        assert!(web.is_supported("people"));
        assert!(web.is_supported("sharing"));
        assert!(!web.is_supported("teams.fullTrust.joinedTeams"));

        let desktop = generate_back_compat_runtime("2.0.5", HostClientType::Desktop);
        assert!(!desktop.is_supported("sharing"));
        assert!(desktop.is_supported("teams.fullTrust.joinedTeams"));
        assert!(desktop.is_supported("webStorage"));

        let rigel = generate_back_compat_runtime("2.0.5", HostClientType::Rigel);
        assert!(rigel.is_supported("people"));
        assert!(rigel.is_supported("teams.fullTrust"));
        assert!(!rigel.is_supported("teams.fullTrust.joinedTeams"));
    }

    #[test]
    fn test_baseline_is_not_modified_by_synthesis() {
        let before = LEGACY_BASELINE.clone();
        let _ = generate_back_compat_runtime("9.9.9", HostClientType::Desktop);
        assert_eq!(*LEGACY_BASELINE, before);
        assert!(!LEGACY_BASELINE.is_supported("webStorage"));
    }

    #[test]
    fn test_duplicate_threshold_keys_append() {
        let table = VersionThresholdTable::new()
            .with_threshold(
                "1.0.0",
                vec![CapabilityRequirement::new(
                    CapabilityTree::new().with_leaf("a"),
                    &[HostClientType::Web],
                )],
            )
            .with_threshold(
                "1.0.0",
                vec![CapabilityRequirement::new(
                    CapabilityTree::new().with_leaf("b"),
                    &[HostClientType::Web],
                )],
            );
        assert_eq!(table.len(), 1);
        let runtime =
            generate_back_compat_runtime_with(&empty_baseline(), &table, "1.0.0", HostClientType::Web);
        assert!(runtime.is_supported("a"));
        assert!(runtime.is_supported("b"));
    }
}
