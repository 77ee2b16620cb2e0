use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("DB: running migration v1 (initial schema)");
        // No foreign keys: records reference each other by id only and are
        // deleted independently.
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                email           TEXT NOT NULL UNIQUE,
                full_name       TEXT NOT NULL,
                avatar          TEXT NOT NULL,
                cover_image     TEXT,
                password        TEXT NOT NULL,
                refresh_token   TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE videos (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL,
                video_file      TEXT NOT NULL,
                thumbnail       TEXT NOT NULL,
                title           TEXT NOT NULL,
                description     TEXT NOT NULL,
                duration        REAL NOT NULL DEFAULT 0,
                views           INTEGER NOT NULL DEFAULT 0,
                is_published    INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_videos_owner ON videos(owner_id, created_at);

            CREATE TABLE comments (
                id              TEXT PRIMARY KEY,
                video_id        TEXT NOT NULL,
                author_id       TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_comments_video ON comments(video_id, created_at);

            CREATE TABLE tweets (
                id              TEXT PRIMARY KEY,
                author_id       TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_tweets_author ON tweets(author_id, created_at);

            CREATE TABLE likes (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                video_id        TEXT,
                comment_id      TEXT,
                tweet_id        TEXT,
                created_at      TEXT NOT NULL,
                CHECK ((video_id IS NOT NULL) + (comment_id IS NOT NULL) + (tweet_id IS NOT NULL) = 1),
                UNIQUE(user_id, video_id),
                UNIQUE(user_id, comment_id),
                UNIQUE(user_id, tweet_id)
            );

            CREATE INDEX idx_likes_video ON likes(video_id);

            CREATE TABLE subscriptions (
                id              TEXT PRIMARY KEY,
                subscriber_id   TEXT NOT NULL,
                channel_id      TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                UNIQUE(subscriber_id, channel_id)
            );

            CREATE INDEX idx_subscriptions_channel ON subscriptions(channel_id);

            CREATE TABLE watch_history (
                user_id         TEXT NOT NULL,
                video_id        TEXT NOT NULL,
                seq             INTEGER NOT NULL,
                watched_at      TEXT NOT NULL,
                PRIMARY KEY (user_id, video_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
