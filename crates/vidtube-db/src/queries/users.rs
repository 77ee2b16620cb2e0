use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use vidtube_types::models::{ChannelProfile, User};

use super::{now, time_at, uuid_at};
use crate::Database;
use crate::models::{CredentialsRow, NewUser};

const USER_COLUMNS: &str =
    "id, username, email, full_name, avatar, cover_image, created_at, updated_at";

impl Database {
    pub fn create_user(&self, new: &NewUser<'_>) -> Result<User> {
        let id = Uuid::new_v4();
        let ts = now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, full_name, avatar, cover_image, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    id.to_string(),
                    new.username,
                    new.email,
                    new.full_name,
                    new.avatar,
                    new.cover_image,
                    new.password_hash,
                    ts,
                ],
            )?;
            query_user(conn, id)?.ok_or_else(|| anyhow!("User {} vanished after insert", id))
        })
    }

    /// True if any account already uses `username` or `email`.
    pub fn user_exists(&self, username: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)",
                params![username, email],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn find_credentials_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<CredentialsRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS}, password FROM users
                 WHERE username = ?1 OR email = ?2 LIMIT 1"
            );
            let row = conn
                .query_row(&sql, params![username, email], map_credentials)
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_credentials(&self, id: Uuid) -> Result<Option<CredentialsRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS}, password FROM users WHERE id = ?1");
            let row = conn
                .query_row(&sql, [id.to_string()], map_credentials)
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Overwrites the single refresh-token slot (`None` clears it).
    pub fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET refresh_token = ?2 WHERE id = ?1",
                params![id.to_string(), token],
            )?;
            Ok(())
        })
    }

    /// Replaces the stored refresh token only if it still equals `presented`.
    /// Returns false when another request rotated it first or it was cleared.
    pub fn rotate_refresh_token(&self, id: Uuid, presented: &str, replacement: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET refresh_token = ?3 WHERE id = ?1 AND refresh_token = ?2",
                params![id.to_string(), presented, replacement],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), password_hash, now()],
            )?;
            Ok(changed == 1)
        })
    }

    /// Partial update: `None` keeps the stored value. Never touches the
    /// password column.
    pub fn update_account(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET full_name = COALESCE(?2, full_name),
                     email = COALESCE(?3, email),
                     updated_at = ?4
                 WHERE id = ?1",
                params![id.to_string(), full_name, email, now()],
            )?;
            query_user(conn, id)
        })
    }

    /// True if `email` belongs to an account other than `id`.
    pub fn email_taken_by_other(&self, id: Uuid, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let taken = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?2 AND id != ?1)",
                params![id.to_string(), email],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    pub fn set_avatar(&self, id: Uuid, url: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET avatar = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), url, now()],
            )?;
            query_user(conn, id)
        })
    }

    pub fn set_cover_image(&self, id: Uuid, url: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET cover_image = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), url, now()],
            )?;
            query_user(conn, id)
        })
    }

    /// Channel page for `username` as seen by `viewer`.
    pub fn channel_profile(&self, username: &str, viewer: Uuid) -> Result<Option<ChannelProfile>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT u.id, u.username, u.full_name, u.avatar, u.cover_image,
                            (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id),
                            (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id),
                            EXISTS(SELECT 1 FROM subscriptions s WHERE s.channel_id = u.id AND s.subscriber_id = ?2)
                     FROM users u WHERE u.username = ?1",
                    params![username, viewer.to_string()],
                    |row| {
                        Ok(ChannelProfile {
                            id: uuid_at(row, 0)?,
                            username: row.get(1)?,
                            full_name: row.get(2)?,
                            avatar: row.get(3)?,
                            cover_image: row.get(4)?,
                            subscribers_count: row.get(5)?,
                            channels_subscribed_to_count: row.get(6)?,
                            is_subscribed: row.get(7)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Moves `video_id` to the front of the user's watch history.
    pub fn record_watch(&self, user_id: Uuid, video_id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO watch_history (user_id, video_id, seq, watched_at)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM watch_history WHERE user_id = ?1), ?3)
                 ON CONFLICT(user_id, video_id) DO UPDATE SET seq = excluded.seq, watched_at = excluded.watched_at",
                params![user_id.to_string(), video_id.to_string(), now()],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = conn.query_row(&sql, [id.to_string()], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        avatar: row.get(4)?,
        cover_image: row.get(5)?,
        created_at: time_at(row, 6)?,
        updated_at: time_at(row, 7)?,
    })
}

fn map_credentials(row: &Row<'_>) -> rusqlite::Result<CredentialsRow> {
    Ok(CredentialsRow {
        user: map_user(row)?,
        password_hash: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_constraint_violation;
    use crate::queries::fixtures;

    #[test]
    fn duplicate_username_is_a_constraint_violation() {
        let db = Database::open_in_memory().unwrap();
        fixtures::user(&db, "ana");

        assert!(db.user_exists("ana", "other@example.com").unwrap());
        assert!(db.user_exists("other", "ana@example.com").unwrap());
        assert!(!db.user_exists("other", "other@example.com").unwrap());

        let err = db
            .create_user(&NewUser {
                username: "ana",
                email: "second@example.com",
                full_name: "Ana Two",
                avatar: "a",
                cover_image: None,
                password_hash: "h",
            })
            .unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn rotation_only_succeeds_against_current_value() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "ana");

        db.set_refresh_token(user.id, Some("r1")).unwrap();
        assert!(db.rotate_refresh_token(user.id, "r1", "r2").unwrap());
        // r1 was rotated away
        assert!(!db.rotate_refresh_token(user.id, "r1", "r3").unwrap());

        assert!(db.rotate_refresh_token(user.id, "r2", "r3").unwrap());

        db.set_refresh_token(user.id, None).unwrap();
        assert!(!db.rotate_refresh_token(user.id, "r3", "r4").unwrap());
    }

    #[test]
    fn account_update_keeps_unset_fields_and_password() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "ana");

        let updated = db.update_account(user.id, Some("Ana Maria"), None).unwrap().unwrap();
        assert_eq!(updated.full_name, "Ana Maria");
        assert_eq!(updated.email, "ana@example.com");

        let creds = db.get_credentials(user.id).unwrap().unwrap();
        assert_eq!(creds.password_hash, "$argon2id$fake");
    }

    #[test]
    fn login_lookup_by_either_identifier() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "ana");

        let by_name = db.find_credentials_by_login(Some("ana"), None).unwrap().unwrap();
        assert_eq!(by_name.user.id, user.id);
        let by_email = db.find_credentials_by_login(None, Some("ana@example.com")).unwrap().unwrap();
        assert_eq!(by_email.user.id, user.id);
        assert!(db.find_credentials_by_login(Some("bob"), None).unwrap().is_none());
    }
}
