//! Post teasers for profile pages.

use chrono::{DateTime, Utc};
use maud::{html, Markup, Render};

use super::metadata::truncate_text;
use crate::posts::PostSummary;
use crate::profile::plain_text;

const TEASER_LEN: usize = 200;

/// Format epoch milliseconds as "Jan 15, 2024 12:34" (UTC).
fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%b %d, %Y %H:%M").to_string())
        .unwrap_or_default()
}

/// A titled list of post teasers linking to their topics.
///
/// ```ignore
/// let list = PostList::new("Latest posts", &page.latest_posts, "/forum");
/// html! { (list) }
/// ```
#[derive(Debug, Clone)]
pub struct PostList<'a> {
    pub title: &'a str,
    pub posts: &'a [PostSummary],
    pub relative_path: &'a str,
}

impl<'a> PostList<'a> {
    #[must_use]
    pub const fn new(title: &'a str, posts: &'a [PostSummary], relative_path: &'a str) -> Self {
        Self {
            title,
            posts,
            relative_path,
        }
    }
}

impl Render for PostList<'_> {
    fn render(&self) -> Markup {
        html! {
            section class="post-list" {
                h3 { (self.title) }
                @if self.posts.is_empty() {
                    p class="empty-state" { "No posts yet." }
                } @else {
                    ul {
                        @for post in self.posts {
                            li data-pid=(post.pid) {
                                a href={ (self.relative_path) "/topic/" (post.topic.slug) } {
                                    (post.topic.title)
                                }
                                " "
                                small {
                                    (format_timestamp(post.timestamp))
                                    @if post.votes != 0 {
                                        " · " (post.votes) " votes"
                                    }
                                }
                                p { (truncate_text(&plain_text(&post.content), TEASER_LEN)) }
                            }
                        }
                    }
                }
            }
        }
    }
}
