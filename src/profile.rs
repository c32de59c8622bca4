//! User profile pages.
//!
//! Collects what a profile shows: the owner's latest and best posts as the
//! viewer is allowed to see them, the view counter, and page metadata.

use std::collections::HashMap;

use anyhow::Result;
use scraper::Html;
use serde::Serialize;
use tracing::debug;

use crate::auth::SessionData;
use crate::config::Config;
use crate::constants::{PROFILE_POSTS_PER_PAGE, PROFILE_VIEW_WINDOW_MS};
use crate::db::parse_ids;
use crate::hooks::ProfilePids;
use crate::keys::{self, PostSet};
use crate::posts::PostSummary;
use crate::privileges;
use crate::users::{UserData, Users};
use crate::{Cid, Forum, Uid};

/// Up to ten of `target`'s posts from `set`, as `caller_uid` may see them.
///
/// Pages of candidate pids are read from every category the caller can
/// read, run through `filter:account.profile.getPids`, hydrated, and
/// filtered. Collection stops once ten posts are kept or a page comes back
/// short.
///
/// # Errors
///
/// Returns an error if a store read or a hook listener fails.
pub async fn get_posts(
    forum: &Forum,
    caller_uid: Uid,
    target: &UserData,
    set: PostSet,
) -> Result<Vec<PostSummary>> {
    let count = PROFILE_POSTS_PER_PAGE;
    let cids = forum
        .privileges
        .get_cids_by_privilege(caller_uid, privileges::TOPICS_READ)
        .await?;
    let set_keys: Vec<String> = cids
        .iter()
        .map(|&cid| keys::user_posts(cid, target.uid, set))
        .collect();

    let (is_admin, is_mod, can_schedule) = tokio::try_join!(
        forum.privileges.is_administrator(caller_uid),
        forum.privileges.is_moderator(caller_uid, &cids),
        forum
            .privileges
            .is_allowed_to(privileges::TOPICS_SCHEDULE, &cids, caller_uid),
    )?;
    let cid_is_mod: HashMap<Cid, bool> = cids.iter().copied().zip(is_mod).collect();
    let cid_can_schedule: HashMap<Cid, bool> = cids.iter().copied().zip(can_schedule).collect();

    let mut posts = Vec::new();
    let mut start = 0i64;
    loop {
        let stop = start + count as i64 - 1;
        let pids = parse_ids(
            &forum
                .store
                .get_sorted_set_rev_range(&set_keys, start, stop)
                .await?,
        );
        let has_more = pids.len() >= count;

        if !pids.is_empty() {
            let data = forum
                .hooks
                .profile_get_pids
                .fire(ProfilePids {
                    uid: caller_uid,
                    target_uid: target.uid,
                    set,
                    pids,
                })
                .await?;

            let candidates = forum.posts.get_post_summaries_by_pids(&data.pids).await?;
            posts.extend(candidates.into_iter().filter(|p| {
                let cid = p.topic.cid;
                is_admin
                    || cid_is_mod.get(&cid).copied().unwrap_or(false)
                    || (p.topic.scheduled && cid_can_schedule.get(&cid).copied().unwrap_or(false))
                    || (!p.deleted && !p.topic.deleted)
            }));
        }

        start += count as i64;
        if posts.len() >= count || !has_more {
            break;
        }
    }

    posts.truncate(count);
    Ok(posts)
}

/// The owner's newest posts.
///
/// # Errors
///
/// See [`get_posts`].
pub async fn get_latest_posts(
    forum: &Forum,
    caller_uid: Uid,
    target: &UserData,
) -> Result<Vec<PostSummary>> {
    get_posts(forum, caller_uid, target, PostSet::Latest).await
}

/// The owner's most upvoted posts.
///
/// # Errors
///
/// See [`get_posts`].
pub async fn get_best_posts(
    forum: &Forum,
    caller_uid: Uid,
    target: &UserData,
) -> Result<Vec<PostSummary>> {
    get_posts(forum, caller_uid, target, PostSet::Best).await
}

/// Count a profile view, at most once per hour per session and profile.
///
/// Guests and owners viewing their own profile are never counted. Returns
/// whether the counter was incremented.
///
/// # Errors
///
/// Returns an error if the counter write fails.
pub async fn increment_profile_views(
    users: &Users,
    session: &mut SessionData,
    caller_uid: Uid,
    target_uid: Uid,
    now_ms: i64,
) -> Result<bool> {
    if caller_uid < 1 || caller_uid == target_uid {
        return Ok(false);
    }

    let due = session
        .uids_viewed
        .get(&target_uid)
        .map_or(true, |&last| last < now_ms - PROFILE_VIEW_WINDOW_MS);
    if !due {
        return Ok(false);
    }

    users
        .increment_user_field_by(target_uid, "profileviews", 1)
        .await?;
    session.uids_viewed.insert(target_uid, now_ms);
    debug!(caller_uid, target_uid, "Profile view counted");
    Ok(true)
}

/// Where a requested profile slug leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugLookup {
    /// Look the user up by this slug.
    Slug(String),
    /// Send the browser to this canonical URL instead.
    Redirect(String),
}

/// Slugs are lowercase. Browsers asking for another casing are redirected;
/// API callers are answered under the lowercase slug directly.
#[must_use]
pub fn canonical_userslug(requested: &str, is_api: bool, relative_path: &str) -> SlugLookup {
    let lowercase = requested.to_lowercase();
    if requested == lowercase || is_api {
        SlugLookup::Slug(lowercase)
    } else {
        SlugLookup::Redirect(format!(
            "{relative_path}/user/{}",
            urlencoding::encode(&lowercase)
        ))
    }
}

/// A `<meta>` tag for the page head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<&'static str>,
    pub content: String,
}

impl MetaTag {
    fn name(name: &'static str, content: impl Into<String>) -> Self {
        Self {
            name: Some(name),
            property: None,
            content: content.into(),
        }
    }

    fn property(property: &'static str, content: impl Into<String>) -> Self {
        Self {
            name: None,
            property: Some(property),
            content: content.into(),
        }
    }
}

/// Text content of an HTML snippet with entities decoded and tags removed.
#[must_use]
pub fn plain_text(html: &str) -> String {
    // Entity-encoded markup becomes real markup on the first pass
    let decoded: String = Html::parse_fragment(html).root_element().text().collect();
    let stripped: String = Html::parse_fragment(&decoded).root_element().text().collect();
    stripped.trim().to_string()
}

/// Title, description and image tags for a profile.
#[must_use]
pub fn meta_tags(user: &UserData) -> Vec<MetaTag> {
    let title = user
        .fullname
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&user.username)
        .to_string();
    let description = user.aboutme.as_deref().map(plain_text).unwrap_or_default();

    let mut tags = vec![
        MetaTag::name("title", title.clone()),
        MetaTag::name("description", description.clone()),
        MetaTag::property("og:title", title),
        MetaTag::property("og:description", description),
    ];

    if let Some(picture) = user.picture.as_deref().filter(|p| !p.is_empty()) {
        tags.push(MetaTag::property("og:image", picture));
        tags.push(MetaTag::property("og:image:url", picture));
    }

    tags
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Everything a profile page renders.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub uid: Uid,
    pub username: String,
    pub userslug: String,
    pub fullname: Option<String>,
    pub aboutme: Option<String>,
    pub picture: Option<String>,
    pub profileviews: i64,
    /// Hidden when reputation is disabled site-wide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<i64>,
    pub is_self: bool,
    /// Same as `latest_posts`, for older clients.
    pub posts: Vec<PostSummary>,
    pub latest_posts: Vec<PostSummary>,
    pub best_posts: Vec<PostSummary>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub title: String,
    pub allow_cover_picture: bool,
    pub email_changed: Option<String>,
    pub selected_groups: Vec<String>,
    pub meta_tags: Vec<MetaTag>,
}

/// Assemble the profile of `user` as seen by `caller_uid`.
///
/// Counts the view and consumes the session's one-shot `email_changed`
/// notice, so the caller should persist `session` afterwards.
///
/// # Errors
///
/// Returns an error if a store read/write or a hook listener fails.
pub async fn build_profile(
    forum: &Forum,
    config: &Config,
    caller_uid: Uid,
    user: UserData,
    session: &mut SessionData,
    now_ms: i64,
) -> Result<ProfilePage> {
    increment_profile_views(&forum.users, session, caller_uid, user.uid, now_ms).await?;

    let (latest_posts, best_posts) = tokio::try_join!(
        get_latest_posts(forum, caller_uid, &user),
        get_best_posts(forum, caller_uid, &user),
    )?;

    let is_self = caller_uid > 0 && caller_uid == user.uid;
    let allow_cover_picture = !is_self
        || config.reputation_disabled
        || user.reputation >= config.min_rep_cover_picture;

    let mut selected_groups = Vec::new();
    for group in &user.group_title {
        if !selected_groups.contains(group) && forum.users.is_group_member(group, user.uid).await? {
            selected_groups.push(group.clone());
        }
    }

    let meta_tags = meta_tags(&user);
    let breadcrumbs = vec![
        Breadcrumb {
            text: "Home".to_string(),
            url: Some(format!("{}/", config.relative_path)),
        },
        Breadcrumb {
            text: user.username.clone(),
            url: None,
        },
    ];

    Ok(ProfilePage {
        uid: user.uid,
        title: user.username.clone(),
        username: user.username,
        userslug: user.userslug,
        fullname: user.fullname,
        aboutme: user.aboutme,
        picture: user.picture,
        profileviews: user.profileviews.max(1),
        reputation: (!config.reputation_disabled).then_some(user.reputation),
        is_self,
        posts: latest_posts.clone(),
        latest_posts,
        best_posts,
        breadcrumbs,
        allow_cover_picture,
        email_changed: session.email_changed.take(),
        selected_groups,
        meta_tags,
    })
}
