//! Forum activity service.
//!
//! Renders user profile pages (latest and best posts, filtered by what the
//! viewer may see) and maintains the recently-active topic indexes, all on
//! top of an ordered key/value store.

pub mod auth;
pub mod components;
pub mod config;
pub mod constants;
pub mod db;
pub mod forum;
pub mod hooks;
pub mod keys;
pub mod posts;
pub mod privileges;
pub mod profile;
pub mod topics;
pub mod users;
pub mod web;

pub use forum::Forum;

/// User id. `0` is a guest.
pub type Uid = i64;
/// Category id.
pub type Cid = i64;
/// Topic id.
pub type Tid = i64;
/// Post id.
pub type Pid = i64;

/// Current time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
