use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use vidtube_types::models::Video;

use super::{now, summary_at, time_at, uuid_at};
use crate::Database;

/// Every video read joins its owner so the response can embed a summary.
pub(crate) const VIDEO_SELECT: &str =
    "SELECT v.id, v.video_file, v.thumbnail, v.title, v.description, v.duration, v.views,
            v.is_published, v.created_at, v.updated_at,
            u.id, u.username, u.full_name, u.avatar
     FROM videos v
     JOIN users u ON u.id = v.owner_id";

pub struct NewVideo<'a> {
    pub owner_id: Uuid,
    pub video_file: &'a str,
    pub thumbnail: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub duration: f64,
}

/// Sortable columns accepted by the listing endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VideoSort {
    #[default]
    CreatedAt,
    Views,
    Duration,
    Title,
}

impl VideoSort {
    pub fn from_param(param: &str) -> Option<Self> {
        match param {
            "createdAt" => Some(Self::CreatedAt),
            "views" => Some(Self::Views),
            "duration" => Some(Self::Duration),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "v.created_at",
            Self::Views => "v.views",
            Self::Duration => "v.duration",
            Self::Title => "v.title COLLATE NOCASE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoFilter {
    /// Case-insensitive title substring.
    pub search: Option<String>,
    pub owner_id: Option<Uuid>,
    /// Unpublished videos are listed only for their owner.
    pub viewer_id: Uuid,
    pub sort: VideoSort,
    pub descending: bool,
    pub limit: u32,
    pub offset: u32,
}

impl Database {
    pub fn insert_video(&self, new: &NewVideo<'_>) -> Result<Video> {
        let id = Uuid::new_v4();
        let ts = now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO videos (id, owner_id, video_file, thumbnail, title, description, duration, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    id.to_string(),
                    new.owner_id.to_string(),
                    new.video_file,
                    new.thumbnail,
                    new.title,
                    new.description,
                    new.duration,
                    ts,
                ],
            )?;
            query_video(conn, id)?.ok_or_else(|| anyhow!("Video {} vanished after insert", id))
        })
    }

    pub fn get_video(&self, id: Uuid) -> Result<Option<Video>> {
        self.with_conn(|conn| query_video(conn, id))
    }

    pub fn list_videos(&self, filter: &VideoFilter) -> Result<Vec<Video>> {
        let direction = if filter.descending { "DESC" } else { "ASC" };
        let sql = format!(
            "{VIDEO_SELECT}
             WHERE (?1 IS NULL OR v.title LIKE '%' || ?1 || '%' ESCAPE '\\')
               AND (?2 IS NULL OR v.owner_id = ?2)
               AND (v.is_published = 1 OR v.owner_id = ?3)
             ORDER BY {} {direction}, v.rowid {direction}
             LIMIT ?4 OFFSET ?5",
            filter.sort.column(),
        );
        let search = filter.search.as_deref().map(escape_like);
        let owner = filter.owner_id.map(|id| id.to_string());

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![search, owner, filter.viewer_id.to_string(), filter.limit, filter.offset],
                    map_video,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Newest first. Unpublished videos are included only when asked for.
    pub fn channel_videos(
        &self,
        owner_id: Uuid,
        include_unpublished: bool,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Video>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{VIDEO_SELECT}
                 WHERE v.owner_id = ?1 AND (?2 OR v.is_published = 1)
                 ORDER BY v.created_at DESC, v.rowid DESC
                 LIMIT ?3 OFFSET ?4"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![owner_id.to_string(), include_unpublished, limit, offset],
                    map_video,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Partial update: `None` keeps the stored value.
    pub fn update_video(
        &self,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Video>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE videos
                 SET title = COALESCE(?2, title),
                     description = COALESCE(?3, description),
                     updated_at = ?4
                 WHERE id = ?1",
                params![id.to_string(), title, description, now()],
            )?;
            query_video(conn, id)
        })
    }

    pub fn delete_video(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM videos WHERE id = ?1", [id.to_string()])?;
            Ok(deleted == 1)
        })
    }

    /// Flips the publish flag in a single statement.
    pub fn toggle_publish(&self, id: Uuid) -> Result<Option<Video>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE videos SET is_published = 1 - is_published, updated_at = ?2 WHERE id = ?1",
                params![id.to_string(), now()],
            )?;
            query_video(conn, id)
        })
    }

    pub fn increment_views(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE videos SET views = views + 1 WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    /// Most recently watched first. Other users' drafts are skipped.
    pub fn watch_history(&self, user_id: Uuid) -> Result<Vec<Video>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{VIDEO_SELECT}
                 JOIN watch_history w ON w.video_id = v.id
                 WHERE w.user_id = ?1 AND (v.is_published = 1 OR v.owner_id = ?1)
                 ORDER BY w.seq DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], map_video)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_video(conn: &Connection, id: Uuid) -> Result<Option<Video>> {
    let sql = format!("{VIDEO_SELECT} WHERE v.id = ?1");
    let row = conn.query_row(&sql, [id.to_string()], map_video).optional()?;
    Ok(row)
}

pub(crate) fn map_video(row: &Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: uuid_at(row, 0)?,
        video_file: row.get(1)?,
        thumbnail: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        duration: row.get(5)?,
        views: row.get(6)?,
        is_published: row.get(7)?,
        created_at: time_at(row, 8)?,
        updated_at: time_at(row, 9)?,
        owner: summary_at(row, 10)?,
    })
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    fn video(db: &Database, owner: Uuid, title: &str) -> Video {
        db.insert_video(&NewVideo {
            owner_id: owner,
            video_file: "https://media.test/v.mp4",
            thumbnail: "https://media.test/t.png",
            title,
            description: "desc",
            duration: 12.5,
        })
        .unwrap()
    }

    fn filter(viewer: Uuid) -> VideoFilter {
        VideoFilter {
            search: None,
            owner_id: None,
            viewer_id: viewer,
            sort: VideoSort::CreatedAt,
            descending: true,
            limit: 10,
            offset: 0,
        }
    }

    #[test]
    fn listing_hides_other_users_drafts() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        let bob = fixtures::user(&db, "bob");
        let draft = video(&db, ana.id, "draft");
        db.toggle_publish(draft.id).unwrap();
        video(&db, ana.id, "public");

        assert_eq!(db.list_videos(&filter(ana.id)).unwrap().len(), 2);
        let seen_by_bob = db.list_videos(&filter(bob.id)).unwrap();
        assert_eq!(seen_by_bob.len(), 1);
        assert_eq!(seen_by_bob[0].title, "public");
    }

    #[test]
    fn search_is_case_insensitive_and_escapes_wildcards() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        video(&db, ana.id, "Rust Ownership");
        video(&db, ana.id, "100% rust");

        let mut f = filter(ana.id);
        f.search = Some("rust".into());
        assert_eq!(db.list_videos(&f).unwrap().len(), 2);

        f.search = Some("%".into());
        let hits = db.list_videos(&f).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% rust");
    }

    #[test]
    fn newest_first_and_paged() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        for title in ["a", "b", "c"] {
            video(&db, ana.id, title);
        }

        let mut f = filter(ana.id);
        f.limit = 2;
        let first: Vec<_> = db.list_videos(&f).unwrap().into_iter().map(|v| v.title).collect();
        assert_eq!(first, ["c", "b"]);
        f.offset = 2;
        let second: Vec<_> = db.list_videos(&f).unwrap().into_iter().map(|v| v.title).collect();
        assert_eq!(second, ["a"]);
    }

    #[test]
    fn partial_update_and_publish_flip() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        let v = video(&db, ana.id, "title");
        assert!(v.is_published);

        let updated = db.update_video(v.id, None, Some("new desc")).unwrap().unwrap();
        assert_eq!(updated.title, "title");
        assert_eq!(updated.description, "new desc");

        assert!(!db.toggle_publish(v.id).unwrap().unwrap().is_published);
        assert!(db.toggle_publish(v.id).unwrap().unwrap().is_published);

        assert!(db.delete_video(v.id).unwrap());
        assert!(!db.delete_video(v.id).unwrap());
        assert!(db.toggle_publish(v.id).unwrap().is_none());
    }

    #[test]
    fn watch_history_moves_rewatched_video_to_front() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        let first = video(&db, ana.id, "first");
        let second = video(&db, ana.id, "second");

        db.record_watch(ana.id, first.id).unwrap();
        db.record_watch(ana.id, second.id).unwrap();
        db.record_watch(ana.id, first.id).unwrap();

        let history: Vec<_> = db.watch_history(ana.id).unwrap().into_iter().map(|v| v.id).collect();
        assert_eq!(history, [first.id, second.id]);
    }

    #[test]
    fn watch_history_skips_drafts_of_other_owners() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        let bob = fixtures::user(&db, "bob");
        let clip = video(&db, ana.id, "clip");

        db.record_watch(bob.id, clip.id).unwrap();
        db.record_watch(ana.id, clip.id).unwrap();
        db.toggle_publish(clip.id).unwrap();

        assert!(db.watch_history(bob.id).unwrap().is_empty());
        assert_eq!(db.watch_history(ana.id).unwrap().len(), 1);
    }
}
