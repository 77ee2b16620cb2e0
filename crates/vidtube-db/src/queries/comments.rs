use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use vidtube_types::models::Comment;

use super::{now, summary_at, time_at, uuid_at};
use crate::Database;

const COMMENT_SELECT: &str =
    "SELECT c.id, c.video_id, c.content, c.created_at, c.updated_at,
            u.id, u.username, u.full_name, u.avatar
     FROM comments c
     JOIN users u ON u.id = c.author_id";

impl Database {
    pub fn insert_comment(&self, video_id: Uuid, author_id: Uuid, content: &str) -> Result<Comment> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, video_id, author_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![id.to_string(), video_id.to_string(), author_id.to_string(), content, now()],
            )?;
            query_comment(conn, id)?.ok_or_else(|| anyhow!("Comment {} vanished after insert", id))
        })
    }

    pub fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    /// Newest first.
    pub fn list_comments(&self, video_id: Uuid, limit: u32, offset: u32) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{COMMENT_SELECT}
                 WHERE c.video_id = ?1
                 ORDER BY c.created_at DESC, c.rowid DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![video_id.to_string(), limit, offset], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), content, now()],
            )?;
            query_comment(conn, id)
        })
    }

    pub fn delete_comment(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id.to_string()])?;
            Ok(deleted == 1)
        })
    }
}

fn query_comment(conn: &Connection, id: Uuid) -> Result<Option<Comment>> {
    let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
    let row = conn.query_row(&sql, [id.to_string()], map_comment).optional()?;
    Ok(row)
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: uuid_at(row, 0)?,
        video_id: uuid_at(row, 1)?,
        content: row.get(2)?,
        created_at: time_at(row, 3)?,
        updated_at: time_at(row, 4)?,
        owner: summary_at(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    #[test]
    fn comments_embed_author_and_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        let video_id = Uuid::new_v4();

        db.insert_comment(video_id, ana.id, "first").unwrap();
        let second = db.insert_comment(video_id, ana.id, "second").unwrap();
        assert_eq!(second.owner.username, "ana");

        let listed: Vec<_> = db
            .list_comments(video_id, 10, 0)
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(listed, ["second", "first"]);
        assert!(db.list_comments(Uuid::new_v4(), 10, 0).unwrap().is_empty());
    }

    #[test]
    fn delete_reports_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        let comment = db.insert_comment(Uuid::new_v4(), ana.id, "bye").unwrap();

        assert!(db.delete_comment(comment.id).unwrap());
        assert!(!db.delete_comment(comment.id).unwrap());
        assert!(db.get_comment(comment.id).unwrap().is_none());
    }
}
