//! Message queues with visibility-timeout semantics.
//!
//! Three queues exist: crawl-queue (CrawlFile ids), process-queue
//! (RawArticle ids) and query-queue (UserQuery ids). Bodies are the decimal
//! id. A received message stays invisible for the visibility timeout; it is
//! redelivered unless deleted first.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use thiserror::Error;

pub const CRAWL_QUEUE: &str = "crawl-queue";
pub const PROCESS_QUEUE: &str = "process-queue";
pub const QUERY_QUEUE: &str = "query-queue";

/// Crawl-queue replenishment threshold and batch size.
pub const CRAWL_QUEUE_ITEMS_LIMIT: i64 = 50;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue backend error: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("Malformed message body: {0}")]
    BadBody(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// A received message. Hold onto it to delete (ack) later.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub receipt: i64,
    pub id: i64,
}

/// Minimal queue-provider contract.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue a numeric id.
    async fn send(&self, id: i64) -> Result<()>;

    /// Receive up to `max` visible messages, hiding them for the visibility
    /// timeout.
    async fn receive(&self, max: i64) -> Result<Vec<QueueMessage>>;

    /// Acknowledge (permanently remove) a received message.
    async fn delete(&self, message: &QueueMessage) -> Result<()>;

    /// Approximate number of messages in the queue, visible or not.
    async fn count(&self) -> Result<i64>;
}

/// Database-backed queue. Multiple processes coordinate through row updates;
/// the `UPDATE ... RETURNING` receive is atomic per connection.
#[derive(Clone)]
pub struct DbQueue {
    pool: SqlitePool,
    name: String,
    visibility: Duration,
}

impl DbQueue {
    pub fn new(pool: SqlitePool, name: &str, visibility: Duration) -> Self {
        Self {
            pool,
            name: name.to_string(),
            visibility,
        }
    }
}

#[async_trait]
impl MessageQueue for DbQueue {
    async fn send(&self, id: i64) -> Result<()> {
        sqlx::query("INSERT INTO queue_messages (queue, body, visible_at) VALUES (?, ?, ?)")
            .bind(&self.name)
            .bind(id.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn receive(&self, max: i64) -> Result<Vec<QueueMessage>> {
        let now = Utc::now();
        let hidden_until = now
            + TimeDelta::from_std(self.visibility).unwrap_or_else(|_| TimeDelta::seconds(120));

        let rows = sqlx::query(
            "UPDATE queue_messages
             SET visible_at = ?, receive_count = receive_count + 1
             WHERE id IN (
                 SELECT id FROM queue_messages
                 WHERE queue = ? AND visible_at <= ?
                 ORDER BY id LIMIT ?
             )
             RETURNING id, body",
        )
        .bind(hidden_until.to_rfc3339())
        .bind(&self.name)
        .bind(now.to_rfc3339())
        .bind(max)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let receipt: i64 = row.get(0);
                let body: String = row.get(1);
                let id = body
                    .parse::<i64>()
                    .map_err(|_| QueueError::BadBody(body.clone()))?;
                Ok(QueueMessage { receipt, id })
            })
            .collect()
    }

    async fn delete(&self, message: &QueueMessage) -> Result<()> {
        sqlx::query("DELETE FROM queue_messages WHERE id = ?")
            .bind(message.receipt)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM queue_messages WHERE queue = ?")
                .bind(&self.name)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;

    async fn queue_with_visibility(secs: u64) -> DbQueue {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        DbQueue::new(ctx.pool().clone(), PROCESS_QUEUE, Duration::from_secs(secs))
    }

    #[tokio::test]
    async fn send_receive_delete_round_trips() {
        let queue = queue_with_visibility(120).await;

        queue.send(42).await.unwrap();
        queue.send(43).await.unwrap();
        assert_eq!(queue.count().await.unwrap(), 2);

        let messages = queue.receive(10).await.unwrap();
        assert_eq!(messages.iter().map(|m| m.id).collect::<Vec<_>>(), vec![42, 43]);

        // Received messages are hidden from a second receive.
        assert!(queue.receive(10).await.unwrap().is_empty());

        for message in &messages {
            queue.delete(message).await.unwrap();
        }
        assert_eq!(queue.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn undeleted_message_becomes_visible_again() {
        let queue = queue_with_visibility(0).await;

        queue.send(7).await.unwrap();
        let first = queue.receive(1).await.unwrap();
        assert_eq!(first.len(), 1);

        // Zero visibility: the message is immediately redeliverable.
        let second = queue.receive(1).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, 7);
    }

    #[tokio::test]
    async fn queues_are_isolated_by_name() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let crawl = DbQueue::new(ctx.pool().clone(), CRAWL_QUEUE, Duration::from_secs(120));
        let process = DbQueue::new(ctx.pool().clone(), PROCESS_QUEUE, Duration::from_secs(120));

        crawl.send(1).await.unwrap();
        assert_eq!(process.count().await.unwrap(), 0);
        assert!(process.receive(10).await.unwrap().is_empty());
        assert_eq!(crawl.count().await.unwrap(), 1);
    }
}
