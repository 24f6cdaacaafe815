//! Pool behavior knobs.

use respool_core::Transition;
use serde::{Deserialize, Serialize};

/// How `release` treats a resource that is not currently `InUse`.
///
/// Both policies accept releasing an already `Idle` resource and journal it.
/// They differ on `UnderMaintenance`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Any tracked resource is forced back to `Idle`, including one under
    /// maintenance.
    #[default]
    Permissive,
    /// Releasing a resource under maintenance is rejected.
    Strict,
}

impl ReleasePolicy {
    pub(crate) fn transition(self) -> Transition {
        match self {
            ReleasePolicy::Permissive => Transition::ForceRelease,
            ReleasePolicy::Strict => Transition::Release,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub release_policy: ReleasePolicy,
}

impl PoolConfig {
    pub fn strict() -> Self {
        Self {
            release_policy: ReleasePolicy::Strict,
        }
    }
}
