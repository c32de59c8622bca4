//! Maud HTML components for the web UI.
//!
//! - `layout`: base page layout and navigation
//! - `metadata`: `<meta>` tags for the page head
//! - `post_list`: post teasers shown on profiles

pub mod layout;
pub mod metadata;
pub mod post_list;

pub use layout::BaseLayout;
pub use metadata::{render_meta_tags, truncate_text};
pub use post_list::PostList;
