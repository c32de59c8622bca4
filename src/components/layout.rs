//! Base layout for the web UI.
//!
//! The HTML skeleton shared by every page: head metadata, navigation and
//! footer.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use super::metadata::render_meta_tags;
use crate::profile::MetaTag;

/// Runs in `<head>` so the stored theme applies before the body renders.
const THEME_INIT_SCRIPT: &str = r#"(function() {
    var theme = localStorage.getItem('theme');
    if (theme) {
        document.documentElement.setAttribute('data-theme', theme);
    } else if (window.matchMedia('(prefers-color-scheme: dark)').matches) {
        document.documentElement.setAttribute('data-theme', 'dark');
    }
})();"#;

/// Base page layout builder.
///
/// ```ignore
/// let page = BaseLayout::new("Alice", "/forum")
///     .with_meta_tags(&profile.meta_tags)
///     .render(content);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLayout<'a> {
    title: &'a str,
    relative_path: &'a str,
    meta_tags: &'a [MetaTag],
}

impl<'a> BaseLayout<'a> {
    /// Links are rooted at `relative_path`.
    #[must_use]
    pub fn new(title: &'a str, relative_path: &'a str) -> Self {
        Self {
            title,
            relative_path,
            meta_tags: &[],
        }
    }

    #[must_use]
    pub fn with_meta_tags(mut self, meta_tags: &'a [MetaTag]) -> Self {
        self.meta_tags = meta_tags;
        self
    }

    /// Render the complete HTML page with `content` inside `<main>`.
    #[must_use]
    pub fn render(self, content: Markup) -> Markup {
        let root = self.relative_path;
        html! {
            (DOCTYPE)
            html lang="en" data-theme="light" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    meta name="color-scheme" content="light dark";
                    title { (self.title) " | Forum" }
                    (render_meta_tags(self.meta_tags))
                    link rel="stylesheet" href={ (root) "/static/css/style.css" };
                    script { (PreEscaped(THEME_INIT_SCRIPT)) }
                }
                body {
                    (self.render_header())
                    main class="container" {
                        (content)
                    }
                    footer class="container" {
                        small {
                            a href={ (root) "/" } { "Forum" }
                        }
                    }
                }
            }
        }
    }

    fn render_header(&self) -> Markup {
        let root = self.relative_path;
        html! {
            header class="container" {
                nav {
                    ul {
                        li { a href={ (root) "/" } { strong class="site-logo" { "Forum" } } }
                    }
                    ul {
                        li { a href={ (root) "/api/topics/latest" } { "Latest" } }
                    }
                }
            }
        }
    }
}
