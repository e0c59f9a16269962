use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use tokio::sync::RwLock;

/// Redis is optional: while no connection is held every operation is a no-op.
#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    connection: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RedisStatus {
    Up,
    Off,
    Down(String),
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, connection: Arc::default() }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let manager = ConnectionManager::new(Client::open(self.url.as_str())?).await?;
        *self.connection.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        *self.connection.write().await = None;
    }

    async fn current(&self) -> Option<ConnectionManager> {
        self.connection.read().await.clone()
    }

    pub(crate) async fn status(&self) -> RedisStatus {
        let Some(mut conn) = self.current().await else {
            return RedisStatus::Off;
        };

        match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(_) => RedisStatus::Up,
            Err(err) => RedisStatus::Down(err.to_string()),
        }
    }

    /// Counts a hit on `key` in a fixed window. `Ok(false)` once `limit` is exceeded.
    pub(crate) async fn rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RedisError> {
        let Some(mut conn) = self.current().await else {
            return Ok(true);
        };

        // SET NX starts the window once; INCR never resets the TTL.
        let (hits,): (u64,) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("EX")
            .arg(window_seconds)
            .arg("NX")
            .ignore()
            .incr(key, 1)
            .query_async(&mut conn)
            .await?;

        Ok(hits <= limit)
    }
}
