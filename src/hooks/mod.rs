//! Plugin filter hooks.
//!
//! Each event has its own typed payload and [`HookRegistry`]. Firing an
//! event with no listeners is the identity transform.

pub mod registry;

pub use registry::{FilterHook, HookRegistry};

use serde::Serialize;

use crate::keys::PostSet;
use crate::{Pid, Tid, Uid};

/// Payload of `filter:account.profile.getPids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfilePids {
    /// The viewer.
    pub uid: Uid,
    /// Owner of the profile being viewed.
    pub target_uid: Uid,
    pub set: PostSet,
    pub pids: Vec<Pid>,
}

/// Payload of `filter:topics.updateRecent`.
///
/// A listener vetoes the recency-index write by clearing either field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecentUpdate {
    pub tid: Option<Tid>,
    pub timestamp: Option<i64>,
}

impl RecentUpdate {
    #[must_use]
    pub const fn new(tid: Tid, timestamp: i64) -> Self {
        Self {
            tid: Some(tid),
            timestamp: Some(timestamp),
        }
    }

    /// The `(tid, timestamp)` pair to index, if both are present and non-zero.
    #[must_use]
    pub fn entry(&self) -> Option<(Tid, i64)> {
        match (self.tid, self.timestamp) {
            (Some(tid), Some(timestamp)) if tid != 0 && timestamp != 0 => Some((tid, timestamp)),
            _ => None,
        }
    }
}

/// Every filter event the forum fires.
pub struct Hooks {
    pub profile_get_pids: HookRegistry<ProfilePids>,
    pub topics_update_recent: HookRegistry<RecentUpdate>,
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            profile_get_pids: HookRegistry::new("account.profile.getPids"),
            topics_update_recent: HookRegistry::new("topics.updateRecent"),
        }
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}
