//! Redis Streams queue adapters.
//!
//! Records are appended with `XADD` under a single `payload` field and read
//! back through a consumer group. Deliveries are acknowledged as soon as they
//! are read, so a crash between read and reconciliation loses nothing that
//! the submission path has not already persisted; the at-least-once contract
//! is carried by reconciliation being idempotent.

use crate::task::{
    domain::TaskRecord,
    ports::{TaskConsumer, TaskPublisher, TaskQueueError, TaskQueueResult},
};
use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, RedisResult,
    aio::{ConnectionManager, MultiplexedConnection},
    streams::{StreamReadOptions, StreamReadReply},
};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Stream entry field holding the serialised task record.
pub const PAYLOAD_FIELD: &str = "payload";

/// Connection settings for the Redis-backed task queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisQueueConfig {
    /// Redis connection URL.
    pub url: String,
    /// Stream key the tasks are appended to.
    pub stream_key: String,
    /// Consumer group shared by reconcilers.
    pub consumer_group: String,
    /// Name of this process within the consumer group.
    pub consumer_name: String,
    /// How long one read blocks before reporting an empty poll.
    pub block: Duration,
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_owned(),
            stream_key: "captcha_tasks".to_owned(),
            consumer_group: "captcha-dispatch".to_owned(),
            consumer_name: "dispatch-1".to_owned(),
            block: Duration::from_secs(1),
        }
    }
}

/// Publishes task records with `XADD`.
#[derive(Clone)]
pub struct RedisTaskPublisher {
    connection: ConnectionManager,
    stream_key: String,
}

impl RedisTaskPublisher {
    /// Opens a managed connection for publishing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Unavailable`] when the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(config: &RedisQueueConfig) -> TaskQueueResult<Self> {
        let client = Client::open(config.url.as_str()).map_err(TaskQueueError::unavailable)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(TaskQueueError::unavailable)?;
        Ok(Self {
            connection,
            stream_key: config.stream_key.clone(),
        })
    }
}

#[async_trait]
impl TaskPublisher for RedisTaskPublisher {
    async fn publish(&self, record: &TaskRecord) -> TaskQueueResult<()> {
        let payload = serde_json::to_vec(record)
            .map_err(|err| TaskQueueError::Serialization(err.to_string()))?;
        let mut connection = self.connection.clone();
        let entry_id: String = connection
            .xadd(&self.stream_key, "*", &[(PAYLOAD_FIELD, payload)])
            .await
            .map_err(TaskQueueError::unavailable)?;
        debug!(task_id = record.id, entry_id = %entry_id, "published task record");
        Ok(())
    }
}

/// Reads task records through a consumer group.
///
/// Blocking reads hold their connection for the whole block interval, so the
/// consumer owns a connection that nothing else shares.
pub struct RedisTaskConsumer {
    connection: Mutex<MultiplexedConnection>,
    config: RedisQueueConfig,
}

impl RedisTaskConsumer {
    /// Connects and creates the consumer group (and stream) if missing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Unavailable`] when the server cannot be
    /// reached or rejects group creation for a reason other than the group
    /// already existing.
    pub async fn connect(config: RedisQueueConfig) -> TaskQueueResult<Self> {
        let client = Client::open(config.url.as_str()).map_err(TaskQueueError::unavailable)?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(TaskQueueError::unavailable)?;
        ensure_group(&mut connection, &config).await?;
        Ok(Self {
            connection: Mutex::new(connection),
            config,
        })
    }
}

async fn ensure_group(
    connection: &mut MultiplexedConnection,
    config: &RedisQueueConfig,
) -> TaskQueueResult<()> {
    let result: RedisResult<()> = redis::cmd("XGROUP")
        .arg("CREATE")
        .arg(&config.stream_key)
        .arg(&config.consumer_group)
        .arg("0")
        .arg("MKSTREAM")
        .query_async(connection)
        .await;

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.to_string().contains("BUSYGROUP") => Ok(()),
        Err(err) => Err(TaskQueueError::unavailable(err)),
    }
}

#[async_trait]
impl TaskConsumer for RedisTaskConsumer {
    async fn next_delivery(&self) -> TaskQueueResult<Option<Vec<u8>>> {
        let mut connection = self.connection.lock().await;
        let block_ms = usize::try_from(self.config.block.as_millis()).unwrap_or(usize::MAX);
        let options = StreamReadOptions::default()
            .group(&self.config.consumer_group, &self.config.consumer_name)
            .count(1)
            .block(block_ms);

        let reply: StreamReadReply = connection
            .xread_options(&[&self.config.stream_key], &[">"], &options)
            .await
            .map_err(TaskQueueError::unavailable)?;

        let Some(entry) = reply
            .keys
            .into_iter()
            .next()
            .and_then(|stream| stream.ids.into_iter().next())
        else {
            return Ok(None);
        };

        let _: i64 = connection
            .xack(
                &self.config.stream_key,
                &self.config.consumer_group,
                &[&entry.id],
            )
            .await
            .map_err(TaskQueueError::unavailable)?;

        // An entry without a payload field is acknowledged and surfaced as an
        // empty delivery so the reconciler logs and drops it.
        let payload: Vec<u8> = entry.map.get(PAYLOAD_FIELD).map_or_else(
            || Ok(Vec::new()),
            |value| {
                redis::FromRedisValue::from_redis_value(value)
                    .map_err(|err| TaskQueueError::Serialization(err.to_string()))
            },
        )?;
        debug!(entry_id = %entry.id, bytes = payload.len(), "received task record");
        Ok(Some(payload))
    }
}
