//! Topic records and topic listings.
//!
//! - `recent`: the recency indexes and time-windowed "latest" queries
//! - `sorted`: category listings by a sort order

mod recent;
mod sorted;

pub use recent::{LatestTopicsOptions, RecentTopics, Term};
pub use sorted::{SortedTopicsQuery, TopicSort};

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::db::{flag, parse_ids, ObjectFields, Store};
use crate::hooks::Hooks;
use crate::posts::Posts;
use crate::privileges::{self, Privileges};
use crate::users::slugify;
use crate::{keys, Cid, Pid, Tid, Uid};

const TOPIC_FIELDS: &[&str] = &[
    "tid",
    "cid",
    "uid",
    "title",
    "slug",
    "timestamp",
    "lastposttime",
    "postcount",
    "deleted",
    "pinned",
    "scheduled",
];

/// A discussion topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub tid: Tid,
    pub cid: Cid,
    pub uid: Uid,
    pub title: String,
    pub slug: String,
    pub timestamp: i64,
    /// Timestamp of the newest non-deleted post.
    pub lastposttime: i64,
    pub postcount: i64,
    pub deleted: bool,
    pub pinned: bool,
    /// Not yet public; visible early only to those allowed to schedule.
    pub scheduled: bool,
}

impl Topic {
    fn from_fields(tid: Tid, fields: &ObjectFields) -> Self {
        Self {
            tid,
            cid: fields.get_i64("cid"),
            uid: fields.get_i64("uid"),
            title: fields.get_str("title").unwrap_or_default().to_string(),
            slug: fields.get_str("slug").unwrap_or_default().to_string(),
            timestamp: fields.get_i64("timestamp"),
            lastposttime: fields.get_i64("lastposttime"),
            postcount: fields.get_i64("postcount"),
            deleted: fields.get_bool("deleted"),
            pinned: fields.get_bool("pinned"),
            scheduled: fields.get_bool("scheduled"),
        }
    }

    /// Load a topic record, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn load(store: &dyn Store, tid: Tid) -> Result<Option<Self>> {
        let fields = store.get_object_fields(&keys::topic(tid), TOPIC_FIELDS).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::from_fields(tid, &fields)))
    }
}

/// Fields for a new topic.
#[derive(Debug, Clone)]
pub struct NewTopic {
    pub uid: Uid,
    pub cid: Cid,
    pub title: String,
    pub timestamp: i64,
    pub pinned: bool,
    pub scheduled: bool,
}

/// One page of a topic listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicsPage {
    pub topics: Vec<Topic>,
    /// `start` of the following page.
    pub next_start: i64,
}

/// Topic service.
#[derive(Clone)]
pub struct Topics {
    store: Arc<dyn Store>,
    hooks: Arc<Hooks>,
    posts: Posts,
    privileges: Privileges,
}

impl Topics {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        hooks: Arc<Hooks>,
        posts: Posts,
        privileges: Privileges,
    ) -> Self {
        Self {
            store,
            hooks,
            posts,
            privileges,
        }
    }

    /// Create a topic record. It enters the recency indexes with its first post.
    ///
    /// # Errors
    ///
    /// Returns an error if a store write fails.
    pub async fn create(&self, topic: &NewTopic) -> Result<Tid> {
        if topic.title.trim().is_empty() {
            bail!("topic title cannot be empty");
        }

        let tid = self
            .store
            .increment_object_field_by(keys::GLOBAL, "nextTid", 1)
            .await?;

        let fields = [
            ("tid", tid.to_string()),
            ("cid", topic.cid.to_string()),
            ("uid", topic.uid.to_string()),
            ("title", topic.title.clone()),
            ("slug", format!("{tid}/{}", slugify(&topic.title))),
            ("timestamp", topic.timestamp.to_string()),
            ("lastposttime", "0".to_string()),
            ("postcount", "0".to_string()),
            ("deleted", flag(false)),
            ("pinned", flag(topic.pinned)),
            ("scheduled", flag(topic.scheduled)),
        ];
        self.store.set_object(&keys::topic(tid), &fields).await?;

        if topic.pinned {
            self.store
                .sorted_set_add(
                    &keys::category_tids_pinned(topic.cid),
                    topic.timestamp as f64,
                    &tid.to_string(),
                )
                .await?;
        }

        Ok(tid)
    }

    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn set_topic_field(&self, tid: Tid, field: &str, value: &str) -> Result<()> {
        self.store
            .set_object_field(&keys::topic(tid), field, value)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_topic_fields(&self, tid: Tid, fields: &[&str]) -> Result<ObjectFields> {
        self.store.get_object_fields(&keys::topic(tid), fields).await
    }

    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_topic_data(&self, tid: Tid) -> Result<Option<Topic>> {
        Topic::load(self.store.as_ref(), tid).await
    }

    /// Hydrate `tids` in order, dropping missing topics and topics in
    /// categories `uid` may not read.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn get_topics(&self, tids: &[Tid], uid: Uid) -> Result<Vec<Topic>> {
        let mut topics = Vec::with_capacity(tids.len());
        for &tid in tids {
            if let Some(topic) = self.get_topic_data(tid).await? {
                topics.push(topic);
            }
        }

        let mut cids: Vec<Cid> = topics.iter().map(|t| t.cid).collect();
        cids.sort_unstable();
        cids.dedup();
        let readable = self
            .privileges
            .is_allowed_to(privileges::TOPICS_READ, &cids, uid)
            .await?;
        let readable: Vec<Cid> = cids
            .into_iter()
            .zip(readable)
            .filter_map(|(cid, ok)| ok.then_some(cid))
            .collect();

        topics.retain(|t| readable.contains(&t.cid));
        Ok(topics)
    }

    /// Newest post of the topic that is not deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn get_latest_undeleted_pid(&self, tid: Tid) -> Result<Option<Pid>> {
        let pids = parse_ids(
            &self
                .store
                .get_sorted_set_rev_range(&[keys::topic_posts(tid)], 0, -1)
                .await?,
        );
        for pid in pids {
            if !self.posts.is_deleted(pid).await? {
                return Ok(Some(pid));
            }
        }
        Ok(None)
    }

    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn increment_post_count(&self, tid: Tid) -> Result<i64> {
        self.store
            .increment_object_field_by(&keys::topic(tid), "postcount", 1)
            .await
    }
}
