//! User profile page.

use maud::{html, Markup};

use crate::components::{BaseLayout, PostList};
use crate::profile::{plain_text, Breadcrumb, ProfilePage};

fn render_breadcrumbs(breadcrumbs: &[Breadcrumb]) -> Markup {
    html! {
        nav aria-label="breadcrumb" {
            ul class="breadcrumbs" {
                @for crumb in breadcrumbs {
                    li {
                        @if let Some(url) = &crumb.url {
                            a href=(url) { (crumb.text) }
                        } @else {
                            span aria-current="page" { (crumb.text) }
                        }
                    }
                }
            }
        }
    }
}

/// Render a profile page.
#[must_use]
pub fn render_profile(page: &ProfilePage, relative_path: &str) -> Markup {
    let content = html! {
        (render_breadcrumbs(&page.breadcrumbs))

        @if let Some(email) = &page.email_changed {
            article class="alert alert-info" role="status" {
                "Your email address was changed to " strong { (email) } "."
            }
        }

        header class="profile-header" data-uid=(page.uid) {
            @if let Some(picture) = &page.picture {
                img class="avatar" src=(picture) alt=(page.username);
            }
            hgroup {
                h1 { (page.username) }
                @if let Some(fullname) = page.fullname.as_deref().filter(|n| !n.is_empty()) {
                    p class="fullname" { (fullname) }
                }
            }
            @if !page.selected_groups.is_empty() {
                ul class="group-badges" {
                    @for group in &page.selected_groups {
                        li class="badge" { (group) }
                    }
                }
            }
            @if page.is_self && page.allow_cover_picture {
                a class="cover-edit" href={ (relative_path) "/user/" (page.userslug) "/edit" } {
                    "Change cover picture"
                }
            }
        }

        dl class="profile-stats" {
            dt { "Profile views" }
            dd { (page.profileviews) }
            @if let Some(reputation) = page.reputation {
                dt { "Reputation" }
                dd { (reputation) }
            }
        }

        @if let Some(aboutme) = page.aboutme.as_deref().map(plain_text).filter(|a| !a.is_empty()) {
            section class="aboutme" {
                p { (aboutme) }
            }
        }

        (PostList::new("Latest posts", &page.latest_posts, relative_path))
        (PostList::new("Best posts", &page.best_posts, relative_path))
    };

    BaseLayout::new(&page.title, relative_path)
        .with_meta_tags(&page.meta_tags)
        .render(content)
}
