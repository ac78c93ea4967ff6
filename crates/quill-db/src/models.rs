//! Database row types — these map directly to SQLite rows.
//! Distinct from quill-types models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use quill_types::models::{Prompt, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct PromptRow {
    pub id: String,
    pub prompt: Option<String>,
    pub username: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id.parse().with_context(|| format!("corrupt user id '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)?,
            username: self.username,
            email: self.email,
            password_hash: self.password,
        })
    }
}

impl PromptRow {
    pub fn into_prompt(self) -> Result<Prompt> {
        Ok(Prompt {
            id: self.id.parse().with_context(|| format!("corrupt prompt id '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)?,
            prompt: self.prompt,
            username: self.username,
        })
    }
}

/// Timestamps are written by the application, not `datetime('now')`, so they
/// keep sub-second precision.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("corrupt timestamp '{}'", raw))?;
    Ok(ts.with_timezone(&Utc))
}
