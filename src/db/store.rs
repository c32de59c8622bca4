//! Ordered key/value store.
//!
//! Everything the forum persists lives in two shapes: sorted sets (member
//! strings ranked by a floating point score) and objects (string fields on
//! a keyed record). [`Store`] is the seam the domain services talk to;
//! [`Database`] implements it on top of SQLite.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;

use super::Database;

/// Sorted-set and object operations used by the forum services.
#[async_trait]
pub trait Store: Send + Sync {
    /// Members of one or more sorted sets merged together, highest score
    /// first, ranks `start..=stop`. A negative `stop` reads to the end.
    ///
    /// A member present in several sets is ranked by its highest score.
    async fn get_sorted_set_rev_range(
        &self,
        keys: &[String],
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>>;

    /// Members of `key` with `min <= score <= max`, highest score first,
    /// skipping `start` and returning at most `count`. `max` of `None` is
    /// `+inf`; a negative `count` means no limit.
    async fn get_sorted_set_rev_range_by_score(
        &self,
        key: &str,
        start: i64,
        count: i64,
        max: Option<f64>,
        min: f64,
    ) -> Result<Vec<String>>;

    /// All members of `key`, lowest score first.
    async fn get_sorted_set_range(&self, key: &str) -> Result<Vec<String>>;

    /// Insert `member` or update its score.
    async fn sorted_set_add(&self, key: &str, score: f64, member: &str) -> Result<()>;

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<()>;

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>>;

    async fn is_sorted_set_member(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self.sorted_set_score(key, member).await?.is_some())
    }

    async fn get_object_field(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Read several fields at once. Missing fields are absent from the map.
    async fn get_object_fields(&self, key: &str, fields: &[&str]) -> Result<ObjectFields>;

    async fn set_object_field(&self, key: &str, field: &str, value: &str) -> Result<()>;

    async fn set_object(&self, key: &str, fields: &[(&str, String)]) -> Result<()>;

    /// Add `by` to an integer field (missing counts as 0) and return the new value.
    async fn increment_object_field_by(&self, key: &str, field: &str, by: i64) -> Result<i64>;
}

/// Field values of one object record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectFields(HashMap<String, String>);

impl ObjectFields {
    #[must_use]
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Integer value of a field; missing or non-numeric reads as 0.
    #[must_use]
    pub fn get_i64(&self, field: &str) -> i64 {
        self.get_str(field)
            .and_then(|v| v.parse::<f64>().ok())
            .map_or(0, |v| v as i64)
    }

    /// Boolean value of a field; `"1"` and `"true"` are true.
    #[must_use]
    pub fn get_bool(&self, field: &str) -> bool {
        matches!(self.get_str(field), Some("1" | "true"))
    }
}

/// Parse numeric sorted-set members into ids, skipping anything else.
#[must_use]
pub fn parse_ids(members: &[String]) -> Vec<i64> {
    members.iter().filter_map(|m| m.parse().ok()).collect()
}

/// Encode a flag the way [`ObjectFields::get_bool`] reads it back.
#[must_use]
pub fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[async_trait]
impl Store for Database {
    async fn get_sorted_set_rev_range(
        &self,
        keys: &[String],
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>> {
        if keys.is_empty() || (stop >= 0 && stop < start) {
            return Ok(Vec::new());
        }
        let limit = if stop < 0 { -1 } else { stop - start + 1 };

        let sql = format!(
            r"
            SELECT member, MAX(score) AS score
            FROM sorted_sets
            WHERE key IN ({})
            GROUP BY member
            ORDER BY score DESC, member DESC
            LIMIT ? OFFSET ?
            ",
            placeholders(keys.len())
        );

        let mut query = sqlx::query(&sql);
        for key in keys {
            query = query.bind(key);
        }
        let rows = query
            .bind(limit)
            .bind(start.max(0))
            .fetch_all(self.pool())
            .await
            .context("Failed to read sorted set range")?;

        Ok(rows.iter().map(|row| row.get("member")).collect())
    }

    async fn get_sorted_set_rev_range_by_score(
        &self,
        key: &str,
        start: i64,
        count: i64,
        max: Option<f64>,
        min: f64,
    ) -> Result<Vec<String>> {
        let limit = if count < 0 { -1 } else { count };

        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT member
            FROM sorted_sets
            WHERE key = ? AND score >= ? AND (? IS NULL OR score <= ?)
            ORDER BY score DESC, member DESC
            LIMIT ? OFFSET ?
            ",
        )
        .bind(key)
        .bind(min)
        .bind(max)
        .bind(max)
        .bind(limit)
        .bind(start.max(0))
        .fetch_all(self.pool())
        .await
        .context("Failed to read sorted set range by score")?;

        Ok(rows.into_iter().map(|(member,)| member).collect())
    }

    async fn get_sorted_set_range(&self, key: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT member FROM sorted_sets WHERE key = ? ORDER BY score ASC, member ASC",
        )
        .bind(key)
        .fetch_all(self.pool())
        .await
        .context("Failed to read sorted set")?;

        Ok(rows.into_iter().map(|(member,)| member).collect())
    }

    async fn sorted_set_add(&self, key: &str, score: f64, member: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO sorted_sets (key, member, score)
            VALUES (?, ?, ?)
            ON CONFLICT (key, member) DO UPDATE SET score = excluded.score
            ",
        )
        .bind(key)
        .bind(member)
        .bind(score)
        .execute(self.pool())
        .await
        .with_context(|| format!("Failed to add {member} to sorted set {key}"))?;

        Ok(())
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<()> {
        sqlx::query("DELETE FROM sorted_sets WHERE key = ? AND member = ?")
            .bind(key)
            .bind(member)
            .execute(self.pool())
            .await
            .with_context(|| format!("Failed to remove {member} from sorted set {key}"))?;

        Ok(())
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>> {
        let row: Option<(f64,)> =
            sqlx::query_as("SELECT score FROM sorted_sets WHERE key = ? AND member = ?")
                .bind(key)
                .bind(member)
                .fetch_optional(self.pool())
                .await
                .context("Failed to read sorted set score")?;

        Ok(row.map(|(score,)| score))
    }

    async fn get_object_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM objects WHERE key = ? AND field = ?")
                .bind(key)
                .bind(field)
                .fetch_optional(self.pool())
                .await
                .context("Failed to read object field")?;

        Ok(row.map(|(value,)| value))
    }

    async fn get_object_fields(&self, key: &str, fields: &[&str]) -> Result<ObjectFields> {
        if fields.is_empty() {
            return Ok(ObjectFields::default());
        }

        let sql = format!(
            "SELECT field, value FROM objects WHERE key = ? AND field IN ({})",
            placeholders(fields.len())
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql).bind(key);
        for field in fields {
            query = query.bind(*field);
        }
        let rows = query
            .fetch_all(self.pool())
            .await
            .with_context(|| format!("Failed to read fields of {key}"))?;

        Ok(ObjectFields::new(rows.into_iter().collect()))
    }

    async fn set_object_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO objects (key, field, value)
            VALUES (?, ?, ?)
            ON CONFLICT (key, field) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(field)
        .bind(value)
        .execute(self.pool())
        .await
        .with_context(|| format!("Failed to set {key}.{field}"))?;

        Ok(())
    }

    async fn set_object(&self, key: &str, fields: &[(&str, String)]) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        for (field, value) in fields {
            sqlx::query(
                r"
                INSERT INTO objects (key, field, value)
                VALUES (?, ?, ?)
                ON CONFLICT (key, field) DO UPDATE SET value = excluded.value
                ",
            )
            .bind(key)
            .bind(*field)
            .bind(value)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to set {key}.{field}"))?;
        }
        tx.commit().await.context("Failed to commit object write")?;

        Ok(())
    }

    async fn increment_object_field_by(&self, key: &str, field: &str, by: i64) -> Result<i64> {
        let (value,): (String,) = sqlx::query_as(
            r"
            INSERT INTO objects (key, field, value)
            VALUES (?, ?, CAST(? AS TEXT))
            ON CONFLICT (key, field)
            DO UPDATE SET value = CAST(CAST(objects.value AS INTEGER) + ? AS TEXT)
            RETURNING value
            ",
        )
        .bind(key)
        .bind(field)
        .bind(by)
        .bind(by)
        .fetch_one(self.pool())
        .await
        .with_context(|| format!("Failed to increment {key}.{field}"))?;

        value
            .parse()
            .with_context(|| format!("{key}.{field} is not an integer: {value}"))
    }
}
