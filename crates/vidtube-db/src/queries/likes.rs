use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use vidtube_types::models::Video;

use super::now;
use super::videos::{VIDEO_SELECT, map_video};
use crate::Database;

/// The single entity a like row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video(Uuid),
    Comment(Uuid),
    Tweet(Uuid),
}

impl LikeTarget {
    fn column(self) -> &'static str {
        match self {
            Self::Video(_) => "video_id",
            Self::Comment(_) => "comment_id",
            Self::Tweet(_) => "tweet_id",
        }
    }

    fn id(self) -> Uuid {
        match self {
            Self::Video(id) | Self::Comment(id) | Self::Tweet(id) => id,
        }
    }
}

impl Database {
    /// Toggle a like: removes if exists, inserts if not.
    /// Returns true when the like was created, false when it was removed.
    /// Both steps run under the connection lock, so two concurrent toggles
    /// cannot both insert.
    pub fn toggle_like(&self, user_id: Uuid, target: LikeTarget) -> Result<bool> {
        let column = target.column();
        let user = user_id.to_string();
        let target_id = target.id().to_string();

        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    &format!("SELECT id FROM likes WHERE user_id = ?1 AND {column} = ?2"),
                    params![user, target_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                conn.execute(
                    &format!("INSERT INTO likes (id, user_id, {column}, created_at) VALUES (?1, ?2, ?3, ?4)"),
                    params![Uuid::new_v4().to_string(), user, target_id, now()],
                )?;
                Ok(true)
            }
        })
    }

    /// Videos the user liked, most recent like first. Likes on deleted
    /// videos drop out through the join; other users' drafts are skipped.
    pub fn liked_videos(&self, user_id: Uuid) -> Result<Vec<Video>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{VIDEO_SELECT}
                 JOIN likes l ON l.video_id = v.id
                 WHERE l.user_id = ?1 AND (v.is_published = 1 OR v.owner_id = ?1)
                 ORDER BY l.created_at DESC, l.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], map_video)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
