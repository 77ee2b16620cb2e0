use anyhow::Result;
use uuid::Uuid;

use vidtube_types::models::ChannelStats;

use crate::Database;

impl Database {
    /// Aggregates for a channel. Likes are counted on the channel's videos.
    pub fn channel_stats(&self, channel_id: Uuid) -> Result<ChannelStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM videos WHERE owner_id = ?1),
                    (SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?1),
                    (SELECT COALESCE(SUM(views), 0) FROM videos WHERE owner_id = ?1),
                    (SELECT COUNT(*) FROM likes l JOIN videos v ON v.id = l.video_id WHERE v.owner_id = ?1)",
                [channel_id.to_string()],
                |row| {
                    Ok(ChannelStats {
                        total_videos: row.get(0)?,
                        total_subscribers: row.get(1)?,
                        total_views: row.get(2)?,
                        total_likes: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }
}
