//! Integration tests for collecting a user's posts for their profile.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use forum_activity::db::Database;
use forum_activity::hooks::{FilterHook, Hooks, ProfilePids};
use forum_activity::keys::PostSet;
use forum_activity::posts::NewPost;
use forum_activity::privileges::{self, Grantee};
use forum_activity::profile::{get_best_posts, get_latest_posts, get_posts};
use forum_activity::topics::NewTopic;
use forum_activity::users::{NewUser, UserData};
use forum_activity::{Cid, Forum, Pid, Tid, Uid};
use tempfile::TempDir;

const BASE_TS: i64 = 1_700_000_000_000;

async fn setup_with_hooks(hooks: Hooks) -> (Forum, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (Forum::new(Arc::new(db), hooks), temp_dir)
}

async fn setup() -> (Forum, TempDir) {
    setup_with_hooks(Hooks::new()).await
}

async fn create_user(forum: &Forum, username: &str) -> UserData {
    let uid = forum
        .users
        .create(&NewUser {
            username: username.to_string(),
            ..NewUser::default()
        })
        .await
        .expect("Failed to create user");
    forum.users.get_user(uid).await.unwrap().unwrap()
}

async fn create_topic(forum: &Forum, uid: Uid, cid: Cid, scheduled: bool) -> (Tid, Pid) {
    forum
        .post_topic(
            &NewTopic {
                uid,
                cid,
                title: "Discussion".to_string(),
                timestamp: BASE_TS,
                pinned: false,
                scheduled,
            },
            "Opening post",
        )
        .await
        .expect("Failed to create topic")
}

/// Add `count` replies by `uid`, one second apart after `BASE_TS`, oldest first.
async fn reply_many(forum: &Forum, uid: Uid, tid: Tid, count: i64) -> Vec<Pid> {
    let mut pids = Vec::new();
    for i in 1..=count {
        let pid = forum
            .reply(&NewPost {
                uid,
                tid,
                content: format!("Reply {i}"),
                timestamp: BASE_TS + i * 1_000,
            })
            .await
            .expect("Failed to reply");
        pids.push(pid);
    }
    pids
}

fn pids_of(posts: &[forum_activity::posts::PostSummary]) -> Vec<Pid> {
    posts.iter().map(|p| p.pid).collect()
}

#[tokio::test]
async fn test_latest_posts_capped_at_ten() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let bob = create_user(&forum, "bob").await;
    let cid = forum.create_category("General").await.unwrap();

    let (tid, _) = create_topic(&forum, alice.uid, cid, false).await;
    let replies = reply_many(&forum, alice.uid, tid, 15).await;

    let posts = get_latest_posts(&forum, bob.uid, &alice).await.unwrap();
    let expected: Vec<Pid> = replies.iter().rev().take(10).copied().collect();
    assert_eq!(pids_of(&posts), expected);
    assert!(posts.iter().all(|p| p.uid == alice.uid && p.topic.tid == tid));
}

#[tokio::test]
async fn test_short_history_returns_everything() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let cid = forum.create_category("General").await.unwrap();

    let (tid, first) = create_topic(&forum, alice.uid, cid, false).await;
    let replies = reply_many(&forum, alice.uid, tid, 2).await;

    let posts = get_latest_posts(&forum, 0, &alice).await.unwrap();
    assert_eq!(pids_of(&posts), vec![replies[1], replies[0], first]);
}

#[tokio::test]
async fn test_no_posts() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    forum.create_category("General").await.unwrap();

    assert!(get_latest_posts(&forum, 0, &alice).await.unwrap().is_empty());
    assert!(get_best_posts(&forum, 0, &alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_no_readable_categories() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let cid = forum.create_category("Staff").await.unwrap();
    let (tid, _) = create_topic(&forum, alice.uid, cid, false).await;
    reply_many(&forum, alice.uid, tid, 3).await;

    forum
        .privileges
        .revoke(cid, privileges::TOPICS_READ, Grantee::Guests)
        .await
        .unwrap();

    assert!(get_latest_posts(&forum, 0, &alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleted_posts_are_skipped_and_backfilled() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let bob = create_user(&forum, "bob").await;
    let cid = forum.create_category("General").await.unwrap();

    let (tid, first) = create_topic(&forum, alice.uid, cid, false).await;
    let replies = reply_many(&forum, alice.uid, tid, 14).await;

    // Remove the five newest
    for &pid in replies.iter().rev().take(5) {
        forum.delete_post(pid).await.unwrap();
    }

    let posts = get_latest_posts(&forum, bob.uid, &alice).await.unwrap();
    // Page one keeps five, page two fills the remaining five
    let mut expected: Vec<Pid> = replies.iter().rev().skip(5).copied().collect();
    expected.push(first);
    assert_eq!(pids_of(&posts), expected);
    assert!(posts.iter().all(|p| !p.deleted));

    // Fewer survivors than a full list: everything that is left comes back
    for &pid in replies.iter().take(6) {
        forum.delete_post(pid).await.unwrap();
    }
    let posts = get_latest_posts(&forum, bob.uid, &alice).await.unwrap();
    let mut expected: Vec<Pid> = replies[6..9].iter().rev().copied().collect();
    expected.push(first);
    assert_eq!(pids_of(&posts), expected);
}

#[tokio::test]
async fn test_deleted_topic_visible_to_moderators_and_admins() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let bob = create_user(&forum, "bob").await;
    let carol = create_user(&forum, "carol").await;
    let dave = create_user(&forum, "dave").await;
    let cid = forum.create_category("General").await.unwrap();

    forum
        .privileges
        .grant(cid, privileges::MODERATE, Grantee::User(carol.uid))
        .await
        .unwrap();
    forum
        .users
        .join_group("administrators", dave.uid)
        .await
        .unwrap();

    let (tid, first) = create_topic(&forum, alice.uid, cid, false).await;
    forum
        .topics
        .set_topic_field(tid, "deleted", "1")
        .await
        .unwrap();

    assert!(get_latest_posts(&forum, bob.uid, &alice).await.unwrap().is_empty());
    assert!(get_latest_posts(&forum, 0, &alice).await.unwrap().is_empty());

    let as_mod = get_latest_posts(&forum, carol.uid, &alice).await.unwrap();
    assert_eq!(pids_of(&as_mod), vec![first]);
    assert!(as_mod[0].topic.deleted);

    let as_admin = get_latest_posts(&forum, dave.uid, &alice).await.unwrap();
    assert_eq!(pids_of(&as_admin), vec![first]);
}

#[tokio::test]
async fn test_moderation_is_per_category() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let carol = create_user(&forum, "carol").await;
    let moderated = forum.create_category("Moderated").await.unwrap();
    let other = forum.create_category("Other").await.unwrap();

    forum
        .privileges
        .grant(moderated, privileges::MODERATE, Grantee::User(carol.uid))
        .await
        .unwrap();

    let (in_moderated, _) = create_topic(&forum, alice.uid, moderated, false).await;
    let (in_other, _) = create_topic(&forum, alice.uid, other, false).await;
    let kept = reply_many(&forum, alice.uid, in_moderated, 1).await[0];
    let dropped = reply_many(&forum, alice.uid, in_other, 1).await[0];
    forum.delete_post(kept).await.unwrap();
    forum.delete_post(dropped).await.unwrap();

    let posts = get_latest_posts(&forum, carol.uid, &alice).await.unwrap();
    let pids = pids_of(&posts);
    assert!(pids.contains(&kept));
    assert!(!pids.contains(&dropped));
}

#[tokio::test]
async fn test_scheduled_topic_needs_schedule_privilege() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let bob = create_user(&forum, "bob").await;
    let cid = forum.create_category("General").await.unwrap();

    // Deleted and scheduled: only schedulers, moderators and admins see it
    let (tid, first) = create_topic(&forum, alice.uid, cid, true).await;
    forum
        .topics
        .set_topic_field(tid, "deleted", "1")
        .await
        .unwrap();

    assert!(get_latest_posts(&forum, bob.uid, &alice).await.unwrap().is_empty());

    forum
        .privileges
        .grant(cid, privileges::TOPICS_SCHEDULE, Grantee::User(bob.uid))
        .await
        .unwrap();

    let posts = get_latest_posts(&forum, bob.uid, &alice).await.unwrap();
    assert_eq!(pids_of(&posts), vec![first]);
    assert!(posts[0].topic.scheduled);
}

#[tokio::test]
async fn test_posts_from_unreadable_category_are_left_out() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let bob = create_user(&forum, "bob").await;
    let public = forum.create_category("Public").await.unwrap();
    let staff = forum.create_category("Staff").await.unwrap();
    forum
        .privileges
        .revoke(staff, privileges::TOPICS_READ, Grantee::RegisteredUsers)
        .await
        .unwrap();
    forum
        .privileges
        .revoke(staff, privileges::TOPICS_READ, Grantee::Guests)
        .await
        .unwrap();

    let (_, visible) = create_topic(&forum, alice.uid, public, false).await;
    let (staff_tid, _) = create_topic(&forum, alice.uid, staff, false).await;
    reply_many(&forum, alice.uid, staff_tid, 3).await;

    let posts = get_latest_posts(&forum, bob.uid, &alice).await.unwrap();
    assert_eq!(pids_of(&posts), vec![visible]);

    // An explicit grant opens the category to that user only
    forum
        .privileges
        .grant(staff, privileges::TOPICS_READ, Grantee::User(bob.uid))
        .await
        .unwrap();
    assert_eq!(get_latest_posts(&forum, bob.uid, &alice).await.unwrap().len(), 5);
    assert_eq!(get_latest_posts(&forum, 0, &alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_best_posts_ordered_by_votes() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let cid = forum.create_category("General").await.unwrap();

    let (tid, first) = create_topic(&forum, alice.uid, cid, false).await;
    let replies = reply_many(&forum, alice.uid, tid, 3).await;

    forum.posts.vote(replies[1], 5).await.unwrap();
    forum.posts.vote(first, 2).await.unwrap();
    forum.posts.vote(replies[2], 3).await.unwrap();
    assert_eq!(forum.posts.vote(replies[2], -4).await.unwrap(), -1);

    let best = get_best_posts(&forum, 0, &alice).await.unwrap();
    assert_eq!(
        pids_of(&best),
        vec![replies[1], first, replies[0], replies[2]]
    );
    assert_eq!(best[0].votes, 5);
}

#[tokio::test]
async fn test_only_target_posts_are_listed() {
    let (forum, _temp_dir) = setup().await;
    let alice = create_user(&forum, "alice").await;
    let bob = create_user(&forum, "bob").await;
    let cid = forum.create_category("General").await.unwrap();

    let (tid, first) = create_topic(&forum, alice.uid, cid, false).await;
    reply_many(&forum, bob.uid, tid, 4).await;

    let posts = get_latest_posts(&forum, 0, &alice).await.unwrap();
    assert_eq!(pids_of(&posts), vec![first]);
    assert_eq!(get_latest_posts(&forum, 0, &bob).await.unwrap().len(), 4);
}

/// Hides every post with an odd pid.
struct EvenPidsOnly;

#[async_trait]
impl FilterHook<ProfilePids> for EvenPidsOnly {
    fn name(&self) -> &'static str {
        "even-pids-only"
    }

    async fn filter(&self, mut payload: ProfilePids) -> Result<ProfilePids> {
        payload.pids.retain(|pid| pid % 2 == 0);
        Ok(payload)
    }
}

/// Rejects any request for the best-posts list.
struct NoBestPosts;

#[async_trait]
impl FilterHook<ProfilePids> for NoBestPosts {
    fn name(&self) -> &'static str {
        "no-best-posts"
    }

    async fn filter(&self, payload: ProfilePids) -> Result<ProfilePids> {
        if payload.set == PostSet::Best {
            anyhow::bail!("best posts are disabled");
        }
        Ok(payload)
    }
}

#[tokio::test]
async fn test_get_pids_hook_filters_pages() {
    let mut hooks = Hooks::new();
    hooks.profile_get_pids.register(Box::new(EvenPidsOnly));
    let (forum, _temp_dir) = setup_with_hooks(hooks).await;

    let alice = create_user(&forum, "alice").await;
    let cid = forum.create_category("General").await.unwrap();
    let (tid, _) = create_topic(&forum, alice.uid, cid, false).await;
    reply_many(&forum, alice.uid, tid, 24).await;

    let posts = get_latest_posts(&forum, 0, &alice).await.unwrap();
    assert_eq!(posts.len(), 10);
    assert!(posts.iter().all(|p| p.pid % 2 == 0));
    // Still newest first
    assert!(posts.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
}

#[tokio::test]
async fn test_get_pids_hook_sees_set_and_errors_propagate() {
    let mut hooks = Hooks::new();
    hooks.profile_get_pids.register(Box::new(NoBestPosts));
    let (forum, _temp_dir) = setup_with_hooks(hooks).await;

    let alice = create_user(&forum, "alice").await;
    let cid = forum.create_category("General").await.unwrap();
    create_topic(&forum, alice.uid, cid, false).await;

    assert_eq!(
        get_posts(&forum, 0, &alice, PostSet::Latest).await.unwrap().len(),
        1
    );
    let err = get_posts(&forum, 0, &alice, PostSet::Best).await.unwrap_err();
    assert!(format!("{err:#}").contains("best posts are disabled"));
}

/// Counts how many pages of pids were fetched.
struct PageCounter(Arc<AtomicUsize>);

#[async_trait]
impl FilterHook<ProfilePids> for PageCounter {
    fn name(&self) -> &'static str {
        "page-counter"
    }

    async fn filter(&self, payload: ProfilePids) -> Result<ProfilePids> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(payload)
    }
}

/// Number of posts returned to a guest, and pages fetched to get them.
async fn latest_with_page_count(
    forum: &Forum,
    pages: &AtomicUsize,
    user: &UserData,
) -> (usize, usize) {
    let before = pages.load(Ordering::SeqCst);
    let posts = get_latest_posts(forum, 0, user).await.unwrap();
    (posts.len(), pages.load(Ordering::SeqCst) - before)
}

#[tokio::test]
async fn test_pages_stop_once_filled_or_exhausted() {
    let pages = Arc::new(AtomicUsize::new(0));
    let mut hooks = Hooks::new();
    hooks
        .profile_get_pids
        .register(Box::new(PageCounter(Arc::clone(&pages))));
    let (forum, _temp_dir) = setup_with_hooks(hooks).await;
    let cid = forum.create_category("General").await.unwrap();

    // 15 visible posts: the first page already holds ten
    let alice = create_user(&forum, "alice").await;
    let (tid, _) = create_topic(&forum, alice.uid, cid, false).await;
    reply_many(&forum, alice.uid, tid, 14).await;
    assert_eq!(latest_with_page_count(&forum, &pages, &alice).await, (10, 1));

    // 25 posts, newest ten deleted: page one keeps nothing, page two fills up
    let bob = create_user(&forum, "bob").await;
    let (tid, _) = create_topic(&forum, bob.uid, cid, false).await;
    let replies = reply_many(&forum, bob.uid, tid, 24).await;
    for &pid in replies.iter().rev().take(10) {
        forum.delete_post(pid).await.unwrap();
    }
    assert_eq!(latest_with_page_count(&forum, &pages, &bob).await, (10, 2));

    // Exactly ten posts, all deleted: the second page is empty and never filtered
    let carol = create_user(&forum, "carol").await;
    let (tid, first) = create_topic(&forum, carol.uid, cid, false).await;
    let replies = reply_many(&forum, carol.uid, tid, 9).await;
    forum.delete_post(first).await.unwrap();
    for &pid in &replies {
        forum.delete_post(pid).await.unwrap();
    }
    assert_eq!(latest_with_page_count(&forum, &pages, &carol).await, (0, 1));

    // A short first page ends the walk
    let dave = create_user(&forum, "dave").await;
    let (tid, _) = create_topic(&forum, dave.uid, cid, false).await;
    reply_many(&forum, dave.uid, tid, 4).await;
    assert_eq!(latest_with_page_count(&forum, &pages, &dave).await, (5, 1));
}
