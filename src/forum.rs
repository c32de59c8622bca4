//! Service wiring.
//!
//! [`Forum`] owns one instance of each domain service, all sharing the same
//! store and hook registries, and sequences the writes that span services.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::db::Store;
use crate::hooks::Hooks;
use crate::posts::{NewPost, Posts};
use crate::privileges::{self, Grantee, Privileges};
use crate::topics::{NewTopic, RecentTopics, Topics};
use crate::users::Users;
use crate::{keys, Cid, Pid, Tid};

#[derive(Clone)]
pub struct Forum {
    pub store: Arc<dyn Store>,
    pub hooks: Arc<Hooks>,
    pub users: Users,
    pub posts: Posts,
    pub topics: Topics,
    pub privileges: Privileges,
}

impl Forum {
    /// Wire the services. Hook listeners must be registered on `hooks` first.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, hooks: Hooks) -> Self {
        let hooks = Arc::new(hooks);
        let privileges = Privileges::new(store.clone());
        let posts = Posts::new(store.clone());
        let topics = Topics::new(store.clone(), hooks.clone(), posts.clone(), privileges.clone());

        Self {
            users: Users::new(store.clone()),
            store,
            hooks,
            posts,
            topics,
            privileges,
        }
    }

    /// Create a category readable by guests and registered users.
    ///
    /// # Errors
    ///
    /// Returns an error if a store write fails.
    pub async fn create_category(&self, name: &str) -> Result<Cid> {
        let cid = self
            .store
            .increment_object_field_by(keys::GLOBAL, "nextCid", 1)
            .await?;
        self.store
            .set_object(
                &keys::category(cid),
                &[("cid", cid.to_string()), ("name", name.to_string())],
            )
            .await?;
        self.store
            .sorted_set_add(keys::CATEGORIES, cid as f64, &cid.to_string())
            .await?;

        self.privileges
            .grant(cid, privileges::TOPICS_READ, Grantee::Guests)
            .await?;
        self.privileges
            .grant(cid, privileges::TOPICS_READ, Grantee::RegisteredUsers)
            .await?;

        info!(cid, name, "Category created");
        Ok(cid)
    }

    /// Create a topic with its first post.
    ///
    /// # Errors
    ///
    /// Returns an error if a store write fails.
    pub async fn post_topic(&self, topic: &NewTopic, content: &str) -> Result<(Tid, Pid)> {
        let tid = self.topics.create(topic).await?;
        let pid = self
            .reply(&NewPost {
                uid: topic.uid,
                tid,
                content: content.to_string(),
                timestamp: topic.timestamp,
            })
            .await?;
        Ok((tid, pid))
    }

    /// Add a post to an existing topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic does not exist or a store write fails.
    pub async fn reply(&self, post: &NewPost) -> Result<Pid> {
        let pid = self.posts.create(post).await?;
        self.topics.increment_post_count(post.tid).await?;
        self.topics
            .update_last_post_time(post.tid, post.timestamp)
            .await?;
        Ok(pid)
    }

    /// Soft-delete a post and re-derive its topic's last post time.
    ///
    /// # Errors
    ///
    /// Returns an error if the post does not exist or a store operation fails.
    pub async fn delete_post(&self, pid: Pid) -> Result<()> {
        let tid = self.posts.set_deleted(pid, true).await?;
        self.topics.update_last_post_time_from_last_pid(tid).await
    }

    /// # Errors
    ///
    /// Returns an error if the post does not exist or a store operation fails.
    pub async fn restore_post(&self, pid: Pid) -> Result<()> {
        let tid = self.posts.set_deleted(pid, false).await?;
        self.topics.update_last_post_time_from_last_pid(tid).await
    }
}
