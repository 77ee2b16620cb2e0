use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use vidtube_types::models::{SubscribedChannel, Subscriber, Subscription};

use super::{now, summary_at, time_at, uuid_at};
use crate::Database;

impl Database {
    /// Toggle a subscription: removes if exists, inserts if not.
    /// Returns the new join row when subscribing, `None` when unsubscribing.
    pub fn toggle_subscription(&self, subscriber_id: Uuid, channel_id: Uuid) -> Result<Option<Subscription>> {
        let subscriber = subscriber_id.to_string();
        let channel = channel_id.to_string();

        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM subscriptions WHERE subscriber_id = ?1 AND channel_id = ?2",
                    params![subscriber, channel],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM subscriptions WHERE id = ?1", [&existing_id])?;
                return Ok(None);
            }

            let id = Uuid::new_v4();
            let ts = now();
            conn.execute(
                "INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), subscriber, channel, ts],
            )?;
            let created_at = conn.query_row(
                "SELECT created_at FROM subscriptions WHERE id = ?1",
                [id.to_string()],
                |row| time_at(row, 0),
            )?;
            Ok(Some(Subscription {
                id,
                subscriber_id,
                channel_id,
                created_at,
            }))
        })
    }

    pub fn list_subscribers(&self, channel_id: Uuid) -> Result<Vec<Subscriber>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.created_at, u.id, u.username, u.full_name, u.avatar
                 FROM subscriptions s
                 JOIN users u ON u.id = s.subscriber_id
                 WHERE s.channel_id = ?1
                 ORDER BY s.created_at DESC, s.rowid DESC",
            )?;
            let rows = stmt
                .query_map([channel_id.to_string()], |row| {
                    Ok(Subscriber {
                        subscription_id: uuid_at(row, 0)?,
                        subscribed_at: time_at(row, 1)?,
                        subscriber: summary_at(row, 2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_subscribed_channels(&self, subscriber_id: Uuid) -> Result<Vec<SubscribedChannel>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.created_at, u.id, u.username, u.full_name, u.avatar
                 FROM subscriptions s
                 JOIN users u ON u.id = s.channel_id
                 WHERE s.subscriber_id = ?1
                 ORDER BY s.created_at DESC, s.rowid DESC",
            )?;
            let rows = stmt
                .query_map([subscriber_id.to_string()], |row| {
                    Ok(SubscribedChannel {
                        subscription_id: uuid_at(row, 0)?,
                        subscribed_at: time_at(row, 1)?,
                        channel: summary_at(row, 2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    #[test]
    fn toggle_subscribes_then_unsubscribes() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        let bob = fixtures::user(&db, "bob");

        let created = db.toggle_subscription(ana.id, bob.id).unwrap().unwrap();
        assert_eq!(created.channel_id, bob.id);

        let subscribers = db.list_subscribers(bob.id).unwrap();
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].subscriber.id, ana.id);

        let channels = db.list_subscribed_channels(ana.id).unwrap();
        assert_eq!(channels[0].channel.username, "bob");

        assert!(db.toggle_subscription(ana.id, bob.id).unwrap().is_none());
        assert!(db.list_subscribers(bob.id).unwrap().is_empty());
    }

    #[test]
    fn channel_profile_counts_and_flags() {
        let db = Database::open_in_memory().unwrap();
        let ana = fixtures::user(&db, "ana");
        let bob = fixtures::user(&db, "bob");
        let cid = fixtures::user(&db, "cid");

        db.toggle_subscription(ana.id, bob.id).unwrap();
        db.toggle_subscription(cid.id, bob.id).unwrap();
        db.toggle_subscription(bob.id, ana.id).unwrap();

        let seen_by_ana = db.channel_profile("bob", ana.id).unwrap().unwrap();
        assert_eq!(seen_by_ana.subscribers_count, 2);
        assert_eq!(seen_by_ana.channels_subscribed_to_count, 1);
        assert!(seen_by_ana.is_subscribed);

        let seen_by_bob = db.channel_profile("bob", bob.id).unwrap().unwrap();
        assert!(!seen_by_bob.is_subscribed);
        assert!(db.channel_profile("nobody", ana.id).unwrap().is_none());
    }
}
