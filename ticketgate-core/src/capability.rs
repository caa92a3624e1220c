//! Capability vocabulary
//!
//! A capability is either a coarse level (`read`, `read-write`) or a
//! specific action right scoped to a queue. Grants are stored as
//! permission keys on `group_user` rows; `rw` satisfies every capability.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Permission key that supersedes every other key
pub const READ_WRITE_KEY: &str = "rw";

/// Permission key for read-only access
pub const READ_ONLY_KEY: &str = "ro";

/// A right a principal may hold on a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Read,
    ReadWrite,
    Create,
    AddNote,
    MoveInto,
    ChangePriority,
    BecomeOwner,
}

impl Capability {
    /// Permission keys that satisfy this capability
    pub fn permission_keys(self) -> &'static [&'static str] {
        match self {
            Capability::Read => &[READ_ONLY_KEY, READ_WRITE_KEY],
            Capability::ReadWrite => &[READ_WRITE_KEY],
            Capability::Create => &["create", READ_WRITE_KEY],
            Capability::AddNote => &["note", READ_WRITE_KEY],
            Capability::MoveInto => &["move_into", READ_WRITE_KEY],
            Capability::ChangePriority => &["priority", READ_WRITE_KEY],
            Capability::BecomeOwner => &["owner", READ_WRITE_KEY],
        }
    }

    /// Check whether a stored permission key grants this capability
    pub fn is_granted_by(self, key: &str) -> bool {
        self.permission_keys().contains(&key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::ReadWrite => "read-write",
            Capability::Create => "create",
            Capability::AddNote => "add-note",
            Capability::MoveInto => "move-into",
            Capability::ChangePriority => "change-priority",
            Capability::BecomeOwner => "become-owner",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse access level a principal holds on a queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    #[default]
    None,
    Read,
    ReadWrite,
}

impl AccessLevel {
    /// Fold a set of permission keys into the highest level they grant
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        keys.into_iter().fold(AccessLevel::None, |level, key| {
            let granted = match key {
                READ_WRITE_KEY => AccessLevel::ReadWrite,
                READ_ONLY_KEY => AccessLevel::Read,
                _ => AccessLevel::None,
            };
            level.max(granted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rw_supersedes_every_capability() {
        for cap in [
            Capability::Read,
            Capability::ReadWrite,
            Capability::Create,
            Capability::AddNote,
            Capability::MoveInto,
            Capability::ChangePriority,
            Capability::BecomeOwner,
        ] {
            assert!(cap.is_granted_by("rw"), "rw should grant {cap}");
        }
    }

    #[test]
    fn test_granular_keys_do_not_grant_read() {
        assert!(!Capability::Read.is_granted_by("create"));
        assert!(!Capability::Read.is_granted_by("move_into"));
        assert!(Capability::Read.is_granted_by("ro"));
        assert!(!Capability::ReadWrite.is_granted_by("ro"));
    }

    #[test]
    fn test_access_level_takes_highest_key() {
        assert_eq!(AccessLevel::from_keys(["ro", "rw"]), AccessLevel::ReadWrite);
        assert_eq!(AccessLevel::from_keys(["note", "ro"]), AccessLevel::Read);
        assert_eq!(AccessLevel::from_keys(["owner"]), AccessLevel::None);
        assert_eq!(AccessLevel::from_keys([]), AccessLevel::None);
    }
}
