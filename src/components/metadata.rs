//! Page head metadata.

use maud::{html, Markup};

use crate::profile::MetaTag;

/// Render `<meta>` tags, keyed by `name` or Open Graph `property`.
pub fn render_meta_tags(tags: &[MetaTag]) -> Markup {
    html! {
        @for tag in tags {
            @if let Some(property) = tag.property {
                meta property=(property) content=(&tag.content);
            } @else if let Some(name) = tag.name {
                meta name=(name) content=(&tag.content);
            }
        }
    }
}

/// Truncate text to `max_len` characters, ending in an ellipsis when cut.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let mut truncated = text.chars().take(max_len.saturating_sub(3)).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
