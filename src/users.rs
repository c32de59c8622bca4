//! User records.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::db::Store;
use crate::{keys, now_ms, Uid};

const USER_FIELDS: &[&str] = &[
    "uid",
    "username",
    "userslug",
    "fullname",
    "aboutme",
    "picture",
    "profileviews",
    "reputation",
    "groupTitle",
];

/// A user as shown on their profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub uid: Uid,
    pub username: String,
    pub userslug: String,
    pub fullname: Option<String>,
    pub aboutme: Option<String>,
    pub picture: Option<String>,
    pub profileviews: i64,
    pub reputation: i64,
    /// Group names the user chose to display, in display order.
    pub group_title: Vec<String>,
}

/// Fields for a new account.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub fullname: Option<String>,
    pub aboutme: Option<String>,
    pub picture: Option<String>,
}

/// Lowercase, dash-separated slug of a username.
#[must_use]
pub fn slugify(username: &str) -> String {
    username
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Clone)]
pub struct Users {
    store: Arc<dyn Store>,
}

impl Users {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create an account, returning its uid.
    ///
    /// # Errors
    ///
    /// Returns an error if the slug is taken or a store write fails.
    pub async fn create(&self, user: &NewUser) -> Result<Uid> {
        let userslug = slugify(&user.username);
        if self.get_uid_by_userslug(&userslug).await?.is_some() {
            anyhow::bail!("username already taken: {}", user.username);
        }

        let uid = self
            .store
            .increment_object_field_by(keys::GLOBAL, "nextUid", 1)
            .await?;

        let mut fields = vec![
            ("uid", uid.to_string()),
            ("username", user.username.clone()),
            ("userslug", userslug.clone()),
            ("joindate", now_ms().to_string()),
            ("profileviews", "0".to_string()),
            ("reputation", "0".to_string()),
        ];
        if let Some(fullname) = &user.fullname {
            fields.push(("fullname", fullname.clone()));
        }
        if let Some(aboutme) = &user.aboutme {
            fields.push(("aboutme", aboutme.clone()));
        }
        if let Some(picture) = &user.picture {
            fields.push(("picture", picture.clone()));
        }

        self.store.set_object(&keys::user(uid), &fields).await?;
        self.store
            .set_object_field(keys::USERSLUG_UID, &userslug, &uid.to_string())
            .await?;

        Ok(uid)
    }

    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_uid_by_userslug(&self, userslug: &str) -> Result<Option<Uid>> {
        Ok(self
            .store
            .get_object_field(keys::USERSLUG_UID, userslug)
            .await?
            .and_then(|uid| uid.parse().ok()))
    }

    /// # Errors
    ///
    /// Returns an error if the store read fails or `groupTitle` is malformed.
    pub async fn get_user(&self, uid: Uid) -> Result<Option<UserData>> {
        let fields = self.store.get_object_fields(&keys::user(uid), USER_FIELDS).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let group_title = match fields.get_str("groupTitle") {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw)
                .with_context(|| format!("Invalid groupTitle for uid {uid}"))?,
            _ => Vec::new(),
        };

        Ok(Some(UserData {
            uid,
            username: fields.get_str("username").unwrap_or_default().to_string(),
            userslug: fields.get_str("userslug").unwrap_or_default().to_string(),
            fullname: fields.get_str("fullname").map(String::from),
            aboutme: fields.get_str("aboutme").map(String::from),
            picture: fields.get_str("picture").map(String::from),
            profileviews: fields.get_i64("profileviews"),
            reputation: fields.get_i64("reputation"),
            group_title,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn get_user_by_userslug(&self, userslug: &str) -> Result<Option<UserData>> {
        match self.get_uid_by_userslug(userslug).await? {
            Some(uid) => self.get_user(uid).await,
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn increment_user_field_by(&self, uid: Uid, field: &str, by: i64) -> Result<i64> {
        self.store
            .increment_object_field_by(&keys::user(uid), field, by)
            .await
    }

    /// Set the groups shown next to the user's name, in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn set_group_title(&self, uid: Uid, groups: &[String]) -> Result<()> {
        let value = serde_json::to_string(groups).context("Failed to encode groupTitle")?;
        self.store
            .set_object_field(&keys::user(uid), "groupTitle", &value)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn join_group(&self, group: &str, uid: Uid) -> Result<()> {
        self.store
            .sorted_set_add(&keys::group_members(group), now_ms() as f64, &uid.to_string())
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn is_group_member(&self, group: &str, uid: Uid) -> Result<bool> {
        self.store
            .is_sorted_set_member(&keys::group_members(group), &uid.to_string())
            .await
    }
}
