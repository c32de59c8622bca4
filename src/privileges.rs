//! Category privileges.
//!
//! A privilege grant is membership of `cid:<cid>:privileges:<name>`. Members
//! are uids or one of the implicit groups [`Grantee::RegisteredUsers`] and
//! [`Grantee::Guests`]. Administrators pass every category check.

use std::sync::Arc;

use anyhow::Result;

use crate::db::{parse_ids, Store};
use crate::{keys, now_ms, Cid, Uid};

pub const TOPICS_READ: &str = "topics:read";
pub const TOPICS_SCHEDULE: &str = "topics:schedule";
pub const MODERATE: &str = "moderate";

/// Who a privilege is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grantee {
    User(Uid),
    /// Every logged-in user.
    RegisteredUsers,
    /// Visitors without an account.
    Guests,
}

impl Grantee {
    fn member(self) -> String {
        match self {
            Self::User(uid) => uid.to_string(),
            Self::RegisteredUsers => "registered-users".to_string(),
            Self::Guests => "guests".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Privileges {
    store: Arc<dyn Store>,
}

impl Privileges {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn is_administrator(&self, uid: Uid) -> Result<bool> {
        if uid <= 0 {
            return Ok(false);
        }
        self.store
            .is_sorted_set_member(keys::ADMINISTRATORS, &uid.to_string())
            .await
    }

    /// Whether `uid` moderates each of `cids`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn is_moderator(&self, uid: Uid, cids: &[Cid]) -> Result<Vec<bool>> {
        let mut result = Vec::with_capacity(cids.len());
        for &cid in cids {
            let is_mod = uid > 0
                && self
                    .store
                    .is_sorted_set_member(&keys::category_privilege(cid, MODERATE), &uid.to_string())
                    .await?;
            result.push(is_mod);
        }
        Ok(result)
    }

    /// Whether `uid` holds `privilege` in each of `cids`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn is_allowed_to(&self, privilege: &str, cids: &[Cid], uid: Uid) -> Result<Vec<bool>> {
        if self.is_administrator(uid).await? {
            return Ok(vec![true; cids.len()]);
        }

        let mut result = Vec::with_capacity(cids.len());
        for &cid in cids {
            result.push(self.has_grant(privilege, cid, uid).await?);
        }
        Ok(result)
    }

    /// Every category in which `uid` holds `privilege`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn get_cids_by_privilege(&self, uid: Uid, privilege: &str) -> Result<Vec<Cid>> {
        let cids = parse_ids(&self.store.get_sorted_set_range(keys::CATEGORIES).await?);
        let allowed = self.is_allowed_to(privilege, &cids, uid).await?;

        Ok(cids
            .into_iter()
            .zip(allowed)
            .filter_map(|(cid, ok)| ok.then_some(cid))
            .collect())
    }

    /// Grant `privilege` in `cid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn grant(&self, cid: Cid, privilege: &str, grantee: Grantee) -> Result<()> {
        self.store
            .sorted_set_add(
                &keys::category_privilege(cid, privilege),
                now_ms() as f64,
                &grantee.member(),
            )
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn revoke(&self, cid: Cid, privilege: &str, grantee: Grantee) -> Result<()> {
        self.store
            .sorted_set_remove(&keys::category_privilege(cid, privilege), &grantee.member())
            .await
    }

    async fn has_grant(&self, privilege: &str, cid: Cid, uid: Uid) -> Result<bool> {
        let key = keys::category_privilege(cid, privilege);
        if uid <= 0 {
            return self
                .store
                .is_sorted_set_member(&key, &Grantee::Guests.member())
                .await;
        }
        if self.store.is_sorted_set_member(&key, &uid.to_string()).await? {
            return Ok(true);
        }
        self.store
            .is_sorted_set_member(&key, &Grantee::RegisteredUsers.member())
            .await
    }
}
