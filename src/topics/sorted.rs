use anyhow::Result;

use super::{Topics, TopicsPage};
use crate::db::parse_ids;
use crate::privileges;
use crate::{keys, Cid, Uid};

/// Ordering of a category listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicSort {
    /// Most recent post first.
    #[default]
    Recent,
}

/// Arguments of [`Topics::get_sorted_topics`].
#[derive(Debug, Clone, Default)]
pub struct SortedTopicsQuery {
    /// Categories to list. Only those the caller can read are used.
    pub cids: Vec<Cid>,
    pub uid: Uid,
    pub start: i64,
    pub stop: i64,
    /// Listing filter; unknown filters list everything.
    pub filter: String,
    pub sort: TopicSort,
}

impl Topics {
    /// One page of topics from the requested categories.
    ///
    /// Categories the caller cannot read are skipped. Deleted topics are only
    /// listed for administrators and moderators of their category.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn get_sorted_topics(&self, query: &SortedTopicsQuery) -> Result<TopicsPage> {
        let readable = self
            .privileges
            .get_cids_by_privilege(query.uid, privileges::TOPICS_READ)
            .await?;
        let set_keys: Vec<String> = query
            .cids
            .iter()
            .copied()
            .filter(|cid| readable.contains(cid))
            .map(keys::category_tids)
            .collect();

        let tids = parse_ids(
            &self
                .store
                .get_sorted_set_rev_range(&set_keys, query.start, query.stop)
                .await?,
        );
        let mut topics = self.get_topics(&tids, query.uid).await?;

        let is_admin = self.privileges.is_administrator(query.uid).await?;
        if !is_admin {
            let topic_cids: Vec<Cid> = topics.iter().map(|t| t.cid).collect();
            let is_mod = self.privileges.is_moderator(query.uid, &topic_cids).await?;
            topics = topics
                .into_iter()
                .zip(is_mod)
                .filter_map(|(topic, is_mod)| (is_mod || !topic.deleted).then_some(topic))
                .collect();
        }

        Ok(TopicsPage {
            topics,
            next_start: query.stop + 1,
        })
    }
}
