//! League roles mapped onto Discord roles.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A league role, optionally mirrored to a Discord role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub discord_role_id: Option<String>,
    pub sync_enabled: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Discord role id when this role is mapped and syncing.
    pub fn synced_discord_role(&self) -> Option<&str> {
        if !self.sync_enabled {
            return None;
        }
        self.discord_role_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Changes needed to bring a member's Discord roles in line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RoleDiff {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl RoleDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff current Discord roles against expected ones.
///
/// Only ids in `managed` are ever removed; roles the league does not own are
/// left alone.
pub fn compute_role_diff(current: &[String], expected: &[String], managed: &[String]) -> RoleDiff {
    let current: BTreeSet<&str> = current.iter().map(String::as_str).collect();
    let expected: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
    let managed: BTreeSet<&str> = managed.iter().map(String::as_str).collect();

    RoleDiff {
        to_add: expected
            .difference(&current)
            .filter(|id| managed.contains(*id))
            .map(|id| id.to_string())
            .collect(),
        to_remove: current
            .difference(&expected)
            .filter(|id| managed.contains(*id))
            .map(|id| id.to_string())
            .collect(),
    }
}

/// Per-user outcome of a role sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    Skipped(String),
    Failed(String),
}

/// Summary of syncing one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RoleSyncReport {
    pub role_id: Uuid,
    pub role_name: String,
    pub synced: u32,
    pub skipped: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

impl RoleSyncReport {
    pub fn new(role: &Role) -> Self {
        Self {
            role_id: role.id,
            role_name: role.name.clone(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, user_id: Uuid, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Synced => self.synced += 1,
            SyncOutcome::Skipped(_) => self.skipped += 1,
            SyncOutcome::Failed(reason) => {
                self.failed += 1;
                self.errors.push(format!("{}: {}", user_id, reason));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_only_touches_managed_roles() {
        let diff = compute_role_diff(
            &ids(&["1", "2", "booster"]),
            &ids(&["2", "3"]),
            &ids(&["1", "2", "3"]),
        );
        assert_eq!(diff.to_add, ids(&["3"]));
        assert_eq!(diff.to_remove, ids(&["1"]));
    }

    #[test]
    fn test_diff_empty_when_in_sync() {
        let diff = compute_role_diff(&ids(&["1"]), &ids(&["1"]), &ids(&["1"]));
        assert!(diff.is_empty());
    }

    #[test]
    fn test_unmapped_or_disabled_role_not_synced() {
        let mut role = Role {
            id: Uuid::new_v4(),
            name: "Coach".to_string(),
            discord_role_id: Some("42".to_string()),
            sync_enabled: true,
            last_synced_at: None,
        };
        assert_eq!(role.synced_discord_role(), Some("42"));
        role.sync_enabled = false;
        assert_eq!(role.synced_discord_role(), None);
        role.sync_enabled = true;
        role.discord_role_id = None;
        assert_eq!(role.synced_discord_role(), None);
    }

    #[test]
    fn test_report_counts() {
        let role = Role {
            id: Uuid::new_v4(),
            name: "Player".to_string(),
            discord_role_id: Some("1".to_string()),
            sync_enabled: true,
            last_synced_at: None,
        };
        let mut report = RoleSyncReport::new(&role);
        report.record(Uuid::new_v4(), SyncOutcome::Synced);
        report.record(Uuid::new_v4(), SyncOutcome::Skipped("no discord".into()));
        report.record(Uuid::new_v4(), SyncOutcome::Failed("timeout".into()));
        assert_eq!((report.synced, report.skipped, report.failed), (1, 1, 1));
        assert_eq!(report.errors.len(), 1);
    }
}
