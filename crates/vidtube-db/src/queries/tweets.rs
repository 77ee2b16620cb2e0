use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use vidtube_types::models::Tweet;

use super::{now, summary_at, time_at, uuid_at};
use crate::Database;

const TWEET_SELECT: &str =
    "SELECT t.id, t.content, t.created_at, t.updated_at,
            u.id, u.username, u.full_name, u.avatar
     FROM tweets t
     JOIN users u ON u.id = t.author_id";

impl Database {
    pub fn insert_tweet(&self, author_id: Uuid, content: &str) -> Result<Tweet> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tweets (id, author_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![id.to_string(), author_id.to_string(), content, now()],
            )?;
            query_tweet(conn, id)?.ok_or_else(|| anyhow!("Tweet {} vanished after insert", id))
        })
    }

    pub fn get_tweet(&self, id: Uuid) -> Result<Option<Tweet>> {
        self.with_conn(|conn| query_tweet(conn, id))
    }

    /// Newest first.
    pub fn list_user_tweets(&self, author_id: Uuid) -> Result<Vec<Tweet>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{TWEET_SELECT}
                 WHERE t.author_id = ?1
                 ORDER BY t.created_at DESC, t.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([author_id.to_string()], map_tweet)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_tweet(&self, id: Uuid, content: &str) -> Result<Option<Tweet>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tweets SET content = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), content, now()],
            )?;
            query_tweet(conn, id)
        })
    }

    pub fn delete_tweet(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tweets WHERE id = ?1", [id.to_string()])?;
            Ok(deleted == 1)
        })
    }
}

fn query_tweet(conn: &Connection, id: Uuid) -> Result<Option<Tweet>> {
    let sql = format!("{TWEET_SELECT} WHERE t.id = ?1");
    let row = conn.query_row(&sql, [id.to_string()], map_tweet).optional()?;
    Ok(row)
}

fn map_tweet(row: &Row<'_>) -> rusqlite::Result<Tweet> {
    Ok(Tweet {
        id: uuid_at(row, 0)?,
        content: row.get(1)?,
        created_at: time_at(row, 2)?,
        updated_at: time_at(row, 3)?,
        owner: summary_at(row, 4)?,
    })
}
