use crate::models::{PromptRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode};
use tracing::debug;

impl Database {
    // -- Users --

    /// Insert a user. Returns `false` when the username or email is already
    /// taken, so a signup race still surfaces as a conflict.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, username, email, password_hash, created_at],
            );

            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    debug!("User insert rejected by unique constraint");
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Prompts --

    pub fn insert_prompt(
        &self,
        id: &str,
        prompt: Option<&str>,
        username: Option<&str>,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO prompts (id, prompt, username, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, prompt, username, created_at],
            )?;
            Ok(())
        })
    }

    /// All prompts saved under `username`, oldest insert first.
    pub fn get_prompts_by_username(&self, username: &str) -> Result<Vec<PromptRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, prompt, username, created_at FROM prompts WHERE username = ?1 ORDER BY rowid",
            )?;

            let rows = stmt
                .query_map([username], |row| {
                    Ok(PromptRow {
                        id: row.get(0)?,
                        prompt: row.get(1)?,
                        username: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Delete every prompt saved under `username`. Returns the number removed.
    pub fn delete_prompts_by_username(&self, username: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM prompts WHERE username = ?1", [username])?;
            Ok(deleted)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // column is always one of our literals, never caller input
    let sql = format!(
        "SELECT id, username, email, password, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format_timestamp;
    use chrono::Utc;
    use uuid::Uuid;

    fn now() -> String {
        format_timestamp(&Utc::now())
    }

    fn add_user(db: &Database, username: &str, email: &str) -> bool {
        db.create_user(&Uuid::new_v4().to_string(), username, email, "$argon2id$fake", &now())
            .unwrap()
    }

    #[test]
    fn user_lookups() {
        let db = Database::open_in_memory().unwrap();
        assert!(add_user(&db, "alice", "alice@x.com"));

        let by_name = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.email, "alice@x.com");

        let by_email = db.get_user_by_email("alice@x.com").unwrap().unwrap();
        assert_eq!(by_email.id, by_name.id);

        let by_id = db.get_user_by_id(&by_name.id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(db.get_user_by_username("bob").unwrap().is_none());
        assert!(db.get_user_by_id(&Uuid::new_v4().to_string()).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_or_username_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(add_user(&db, "alice", "alice@x.com"));
        assert!(!add_user(&db, "bob", "alice@x.com"));
        assert!(!add_user(&db, "alice", "other@x.com"));
        assert!(add_user(&db, "bob", "bob@x.com"));
    }

    #[test]
    fn prompts_are_listed_in_insert_order() {
        let db = Database::open_in_memory().unwrap();
        for text in ["first", "second", "third"] {
            db.insert_prompt(&Uuid::new_v4().to_string(), Some(text), Some("alice"), &now())
                .unwrap();
        }
        db.insert_prompt(&Uuid::new_v4().to_string(), Some("other"), Some("bob"), &now())
            .unwrap();

        let rows = db.get_prompts_by_username("alice").unwrap();
        let texts: Vec<_> = rows.iter().map(|r| r.prompt.as_deref().unwrap()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn delete_counts_only_matching_prompts() {
        let db = Database::open_in_memory().unwrap();
        db.insert_prompt(&Uuid::new_v4().to_string(), Some("a"), Some("alice"), &now()).unwrap();
        db.insert_prompt(&Uuid::new_v4().to_string(), Some("b"), Some("alice"), &now()).unwrap();
        db.insert_prompt(&Uuid::new_v4().to_string(), Some("c"), Some("bob"), &now()).unwrap();

        assert_eq!(db.delete_prompts_by_username("alice").unwrap(), 2);
        assert_eq!(db.delete_prompts_by_username("alice").unwrap(), 0);
        assert!(db.get_prompts_by_username("alice").unwrap().is_empty());
        assert_eq!(db.get_prompts_by_username("bob").unwrap().len(), 1);
    }

    #[test]
    fn prompt_without_username_is_stored_but_never_listed() {
        let db = Database::open_in_memory().unwrap();
        db.insert_prompt(&Uuid::new_v4().to_string(), Some("orphan"), None, &now()).unwrap();
        assert!(db.get_prompts_by_username("").unwrap().is_empty());
    }
}
