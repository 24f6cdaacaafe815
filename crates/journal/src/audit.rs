//! Journal audit report.
//!
//! Summarizes a replayed journal per resource. The journal spans restarts
//! while the resource set does not, so the findings here are observations
//! (an allocation left open when a process exited looks "outstanding"),
//! not proof of a broken pool.

use respool_core::{JournalEntry, ResourceId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Activity recorded for a single resource ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceActivity {
    pub id: ResourceId,
    pub allocations: usize,
    pub releases: usize,
    /// Releases with no allocation since the previous release.
    pub idempotent_releases: usize,
    /// Allocations with no release since the previous allocation.
    pub unreleased_reallocations: usize,
    /// Last event for this resource was an allocation.
    pub outstanding: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub total_entries: usize,
    pub allocations: usize,
    pub releases: usize,
    pub idempotent_releases: usize,
    pub unreleased_reallocations: usize,
    /// Sorted by resource ID.
    pub resources: Vec<ResourceActivity>,
    pub outstanding: Vec<ResourceId>,
}

impl AuditReport {
    pub fn build(entries: &[JournalEntry]) -> Self {
        let mut by_id: BTreeMap<ResourceId, ResourceActivity> = BTreeMap::new();

        for entry in entries {
            let id = entry.resource_id();
            let activity = by_id.entry(id).or_insert_with(|| ResourceActivity {
                id,
                ..Default::default()
            });

            match entry {
                JournalEntry::Allocated(_) => {
                    activity.allocations += 1;
                    if activity.outstanding {
                        activity.unreleased_reallocations += 1;
                    }
                    activity.outstanding = true;
                }
                JournalEntry::Released(_) => {
                    activity.releases += 1;
                    if !activity.outstanding {
                        activity.idempotent_releases += 1;
                    }
                    activity.outstanding = false;
                }
            }
        }

        let resources: Vec<ResourceActivity> = by_id.into_values().collect();
        let sum = |f: fn(&ResourceActivity) -> usize| resources.iter().map(f).sum::<usize>();

        AuditReport {
            total_entries: entries.len(),
            allocations: sum(|a| a.allocations),
            releases: sum(|a| a.releases),
            idempotent_releases: sum(|a| a.idempotent_releases),
            unreleased_reallocations: sum(|a| a.unreleased_reallocations),
            outstanding: resources
                .iter()
                .filter(|a| a.outstanding)
                .map(|a| a.id)
                .collect(),
            resources,
        }
    }

    /// Render the report as a formatted string.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push('\n');
        out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                   RESPOOL JOURNAL AUDIT                      ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str(&format!(
            "║  Entries:            {:>39} ║\n",
            self.total_entries
        ));
        out.push_str(&format!(
            "║  Allocations:        {:>39} ║\n",
            self.allocations
        ));
        out.push_str(&format!("║  Releases:           {:>39} ║\n", self.releases));
        out.push_str(&format!(
            "║  Idempotent releases:{:>39} ║\n",
            self.idempotent_releases
        ));
        out.push_str(&format!(
            "║  Re-allocations:     {:>39} ║\n",
            self.unreleased_reallocations
        ));
        out.push_str(&format!(
            "║  Outstanding:        {:>39} ║\n",
            self.outstanding.len()
        ));
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        if self.resources.is_empty() {
            out.push_str("║  Journal is empty.                                           ║\n");
        } else {
            for a in &self.resources {
                out.push_str(&format!(
                    "║  ID {:<8} alloc {:>6}  rel {:>6}  {:<22}║\n",
                    a.id,
                    a.allocations,
                    a.releases,
                    if a.outstanding { "OUTSTANDING" } else { "" }
                ));
            }
        }

        out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        out
    }
}
