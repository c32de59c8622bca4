use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{SortedTopicsQuery, TopicSort, Topics, TopicsPage};
use crate::db::parse_ids;
use crate::hooks::RecentUpdate;
use crate::{keys, now_ms, Cid, Tid, Uid};

/// Time window of a "latest topics" query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Term {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Term {
    /// Parse a term name. Anything unrecognised is a day.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "week" => Self::Week,
            "month" => Self::Month,
            "year" => Self::Year,
            _ => Self::Day,
        }
    }

    /// Window length in milliseconds. Months are 30 days and years 360.
    #[must_use]
    pub const fn window_ms(&self) -> i64 {
        match self {
            Self::Day => 86_400_000,
            Self::Week => 604_800_000,
            Self::Month => 2_592_000_000,
            Self::Year => 31_104_000_000,
        }
    }
}

/// Arguments of [`RecentTopics::get_latest_topics`].
#[derive(Debug, Clone, Deserialize)]
pub struct LatestTopicsOptions {
    #[serde(default)]
    pub uid: Uid,
    #[serde(default)]
    pub start: i64,
    #[serde(default = "default_stop")]
    pub stop: i64,
    #[serde(default)]
    pub term: String,
}

const fn default_stop() -> i64 {
    19
}

/// Recently-active topic indexes.
#[async_trait]
pub trait RecentTopics: Send + Sync {
    /// Topics of a category ordered by last post time.
    async fn get_recent_topics(
        &self,
        cid: Cid,
        uid: Uid,
        start: i64,
        stop: i64,
        filter: &str,
    ) -> Result<TopicsPage>;

    /// Hydrated topics from the global recency index within `options.term`.
    async fn get_latest_topics(&self, options: &LatestTopicsOptions) -> Result<TopicsPage>;

    /// Tids from `key` scored within the last `term`, newest first.
    ///
    /// `stop == -1` is passed to the store as the count unchanged.
    async fn get_latest_tids_from_set(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        term: &str,
    ) -> Result<Vec<Tid>>;

    /// Re-derive the last post time from the newest non-deleted post.
    async fn update_last_post_time_from_last_pid(&self, tid: Tid) -> Result<()>;

    /// Record a new last post time in the topic and every recency index.
    async fn update_last_post_time(&self, tid: Tid, lastposttime: i64) -> Result<()>;

    /// Write the global recency index, subject to `filter:topics.updateRecent`.
    async fn update_recent(&self, tid: Tid, timestamp: i64) -> Result<()>;
}

#[async_trait]
impl RecentTopics for Topics {
    async fn get_recent_topics(
        &self,
        cid: Cid,
        uid: Uid,
        start: i64,
        stop: i64,
        filter: &str,
    ) -> Result<TopicsPage> {
        self.get_sorted_topics(&SortedTopicsQuery {
            cids: vec![cid],
            uid,
            start,
            stop,
            filter: filter.to_string(),
            sort: TopicSort::Recent,
        })
        .await
    }

    async fn get_latest_topics(&self, options: &LatestTopicsOptions) -> Result<TopicsPage> {
        let tids = self
            .get_latest_tids_from_set(keys::TOPICS_RECENT, options.start, options.stop, &options.term)
            .await?;
        let topics = self.get_topics(&tids, options.uid).await?;

        Ok(TopicsPage {
            topics,
            next_start: options.stop + 1,
        })
    }

    async fn get_latest_tids_from_set(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        term: &str,
    ) -> Result<Vec<Tid>> {
        let since = Term::parse(term).window_ms();
        let count = if stop == -1 { stop } else { stop - start + 1 };

        let members = self
            .store
            .get_sorted_set_rev_range_by_score(key, start, count, None, (now_ms() - since) as f64)
            .await?;
        Ok(parse_ids(&members))
    }

    async fn update_last_post_time_from_last_pid(&self, tid: Tid) -> Result<()> {
        let Some(pid) = self.get_latest_undeleted_pid(tid).await? else {
            debug!(tid, "No undeleted posts left, keeping last post time");
            return Ok(());
        };
        let timestamp = self.posts.get_post_timestamp(pid).await?;
        if timestamp == 0 {
            return Ok(());
        }
        self.update_last_post_time(tid, timestamp).await
    }

    async fn update_last_post_time(&self, tid: Tid, lastposttime: i64) -> Result<()> {
        self.set_topic_field(tid, "lastposttime", &lastposttime.to_string())
            .await?;
        let topic = self
            .get_topic_fields(tid, &["cid", "deleted", "pinned"])
            .await?;
        let cid = topic.get_i64("cid");
        let member = tid.to_string();

        self.store
            .sorted_set_add(
                &keys::category_tids_lastposttime(cid),
                lastposttime as f64,
                &member,
            )
            .await?;

        self.update_recent(tid, lastposttime).await?;

        if !topic.get_bool("pinned") {
            self.store
                .sorted_set_add(&keys::category_tids(cid), lastposttime as f64, &member)
                .await?;
        }

        Ok(())
    }

    async fn update_recent(&self, tid: Tid, timestamp: i64) -> Result<()> {
        let mut data = RecentUpdate::new(tid, timestamp);
        if self.hooks.topics_update_recent.has_listeners() {
            data = self.hooks.topics_update_recent.fire(data).await?;
        }

        match data.entry() {
            Some((tid, timestamp)) => {
                self.store
                    .sorted_set_add(keys::TOPICS_RECENT, timestamp as f64, &tid.to_string())
                    .await
            }
            None => {
                debug!(tid, "Recency index update vetoed by filter:topics.updateRecent");
                Ok(())
            }
        }
    }
}
