//! Post records and the per-user post indexes.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::db::{flag, Store};
use crate::keys::{self, PostSet};
use crate::topics::Topic;
use crate::{Pid, Tid, Uid};

const POST_FIELDS: &[&str] = &["pid", "uid", "tid", "timestamp", "votes", "deleted", "content"];

/// A post together with the topic it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    pub pid: Pid,
    pub uid: Uid,
    pub tid: Tid,
    pub timestamp: i64,
    pub votes: i64,
    pub deleted: bool,
    pub content: String,
    pub topic: Topic,
}

/// Fields for a new post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub uid: Uid,
    pub tid: Tid,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Clone)]
pub struct Posts {
    store: Arc<dyn Store>,
}

impl Posts {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Write a post and add it to the topic and per-user indexes.
    ///
    /// The topic's recency indexes are not touched here.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic does not exist or a store write fails.
    pub async fn create(&self, post: &NewPost) -> Result<Pid> {
        let Some(topic) = Topic::load(self.store.as_ref(), post.tid).await? else {
            bail!("cannot post to missing topic {}", post.tid);
        };

        let pid = self
            .store
            .increment_object_field_by(keys::GLOBAL, "nextPid", 1)
            .await?;
        let member = pid.to_string();

        let fields = [
            ("pid", member.clone()),
            ("uid", post.uid.to_string()),
            ("tid", post.tid.to_string()),
            ("timestamp", post.timestamp.to_string()),
            ("votes", "0".to_string()),
            ("deleted", flag(false)),
            ("content", post.content.clone()),
        ];
        self.store.set_object(&keys::post(pid), &fields).await?;

        let timestamp = post.timestamp as f64;
        self.store
            .sorted_set_add(&keys::topic_posts(post.tid), timestamp, &member)
            .await?;
        self.store
            .sorted_set_add(
                &keys::user_posts(topic.cid, post.uid, PostSet::Latest),
                timestamp,
                &member,
            )
            .await?;
        self.store
            .sorted_set_add(&keys::user_posts(topic.cid, post.uid, PostSet::Best), 0.0, &member)
            .await?;

        Ok(pid)
    }

    /// Hydrate `pids` in order. Posts that do not exist, or whose topic does
    /// not exist, are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn get_post_summaries_by_pids(&self, pids: &[Pid]) -> Result<Vec<PostSummary>> {
        let mut summaries = Vec::with_capacity(pids.len());
        for &pid in pids {
            let fields = self.store.get_object_fields(&keys::post(pid), POST_FIELDS).await?;
            if fields.is_empty() {
                continue;
            }
            let tid = fields.get_i64("tid");
            let Some(topic) = Topic::load(self.store.as_ref(), tid).await? else {
                continue;
            };

            summaries.push(PostSummary {
                pid,
                uid: fields.get_i64("uid"),
                tid,
                timestamp: fields.get_i64("timestamp"),
                votes: fields.get_i64("votes"),
                deleted: fields.get_bool("deleted"),
                content: fields.get_str("content").unwrap_or_default().to_string(),
                topic,
            });
        }
        Ok(summaries)
    }

    /// Post timestamp, or 0 if the post has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_post_timestamp(&self, pid: Pid) -> Result<i64> {
        let fields = self
            .store
            .get_object_fields(&keys::post(pid), &["timestamp"])
            .await?;
        Ok(fields.get_i64("timestamp"))
    }

    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn is_deleted(&self, pid: Pid) -> Result<bool> {
        let fields = self
            .store
            .get_object_fields(&keys::post(pid), &["deleted"])
            .await?;
        Ok(fields.get_bool("deleted"))
    }

    /// Flag a post deleted or restored, returning its tid.
    ///
    /// # Errors
    ///
    /// Returns an error if the post does not exist or the store write fails.
    pub async fn set_deleted(&self, pid: Pid, deleted: bool) -> Result<Tid> {
        let fields = self.store.get_object_fields(&keys::post(pid), &["tid"]).await?;
        if fields.is_empty() {
            bail!("no such post: {pid}");
        }
        self.store
            .set_object_field(&keys::post(pid), "deleted", &flag(deleted))
            .await?;
        Ok(fields.get_i64("tid"))
    }

    /// Adjust a post's votes and rescore it in its author's votes index.
    ///
    /// # Errors
    ///
    /// Returns an error if the post or its topic does not exist, or a store
    /// operation fails.
    pub async fn vote(&self, pid: Pid, delta: i64) -> Result<i64> {
        let fields = self
            .store
            .get_object_fields(&keys::post(pid), &["uid", "tid"])
            .await?;
        if fields.is_empty() {
            bail!("no such post: {pid}");
        }
        let Some(topic) = Topic::load(self.store.as_ref(), fields.get_i64("tid")).await? else {
            bail!("post {pid} belongs to a missing topic");
        };

        let votes = self
            .store
            .increment_object_field_by(&keys::post(pid), "votes", delta)
            .await?;
        self.store
            .sorted_set_add(
                &keys::user_posts(topic.cid, fields.get_i64("uid"), PostSet::Best),
                votes as f64,
                &pid.to_string(),
            )
            .await?;

        Ok(votes)
    }
}
