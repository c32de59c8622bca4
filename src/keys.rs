//! Store key conventions.
//!
//! Every sorted-set and object key the forum reads or writes is built here.

use crate::{Cid, Pid, Tid, Uid};

/// Global recency index: tid scored by last post time.
pub const TOPICS_RECENT: &str = "topics:recent";

/// All category ids.
pub const CATEGORIES: &str = "categories:cid";

/// Members of the administrators group.
pub const ADMINISTRATORS: &str = "group:administrators:members";

/// Object holding id counters.
pub const GLOBAL: &str = "global";

/// Object mapping user slugs to uids.
pub const USERSLUG_UID: &str = "userslug:uid";

/// Which per-user post index to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PostSet {
    /// Scored by post timestamp.
    Latest,
    /// Scored by votes.
    Best,
}

impl PostSet {
    /// Key suffix of the index.
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Latest => "pids",
            Self::Best => "pids:votes",
        }
    }
}

/// A user's posts within one category, e.g. `cid:3:uid:7:pids:votes`.
#[must_use]
pub fn user_posts(cid: Cid, uid: Uid, set: PostSet) -> String {
    format!("cid:{cid}:uid:{uid}:{}", set.suffix())
}

/// Non-pinned topics of a category by last post time.
#[must_use]
pub fn category_tids(cid: Cid) -> String {
    format!("cid:{cid}:tids")
}

/// Every topic of a category by last post time, pinned included.
#[must_use]
pub fn category_tids_lastposttime(cid: Cid) -> String {
    format!("cid:{cid}:tids:lastposttime")
}

/// Pinned topics of a category.
#[must_use]
pub fn category_tids_pinned(cid: Cid) -> String {
    format!("cid:{cid}:tids:pinned")
}

/// Grantees of a category privilege, e.g. `cid:3:privileges:topics:read`.
#[must_use]
pub fn category_privilege(cid: Cid, privilege: &str) -> String {
    format!("cid:{cid}:privileges:{privilege}")
}

/// Members of a named group.
#[must_use]
pub fn group_members(name: &str) -> String {
    format!("group:{name}:members")
}

/// Posts of a topic by timestamp.
#[must_use]
pub fn topic_posts(tid: Tid) -> String {
    format!("tid:{tid}:posts")
}

#[must_use]
pub fn category(cid: Cid) -> String {
    format!("category:{cid}")
}

#[must_use]
pub fn user(uid: Uid) -> String {
    format!("user:{uid}")
}

#[must_use]
pub fn topic(tid: Tid) -> String {
    format!("topic:{tid}")
}

#[must_use]
pub fn post(pid: Pid) -> String {
    format!("post:{pid}")
}

#[must_use]
pub fn session(token: &str) -> String {
    format!("session:{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_post_keys() {
        assert_eq!(user_posts(3, 7, PostSet::Latest), "cid:3:uid:7:pids");
        assert_eq!(user_posts(3, 7, PostSet::Best), "cid:3:uid:7:pids:votes");
    }

    #[test]
    fn test_category_keys() {
        assert_eq!(category_tids(5), "cid:5:tids");
        assert_eq!(category_tids_lastposttime(5), "cid:5:tids:lastposttime");
        assert_eq!(category_tids_pinned(5), "cid:5:tids:pinned");
        assert_eq!(
            category_privilege(5, "topics:read"),
            "cid:5:privileges:topics:read"
        );
    }

    #[test]
    fn test_record_keys() {
        assert_eq!(category(4), "category:4");
        assert_eq!(user(1), "user:1");
        assert_eq!(topic(2), "topic:2");
        assert_eq!(post(3), "post:3");
        assert_eq!(topic_posts(2), "tid:2:posts");
        assert_eq!(session("abc"), "session:abc");
        assert_eq!(group_members("administrators"), ADMINISTRATORS);
    }
}
