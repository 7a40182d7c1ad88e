//! Point reads against CONFIG_DB.
//!
//! Managers that react to APPL_DB occasionally need to look at what
//! CONFIG_DB still declares for the same key. These are one-off HGETs,
//! not subscriptions, over a connection opened on first use.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::error::{BgpCfgError, BgpCfgResult};
use crate::manager::DbId;

/// Read-only access to hash fields of one database.
#[async_trait]
pub trait ConfigDbReader: Send + Sync {
    /// Returns `field` of the hash stored at `key`, if any.
    async fn hget(&mut self, key: &str, field: &str) -> BgpCfgResult<Option<String>>;
}

/// Opens [`ConfigDbReader`] connections on demand.
#[async_trait]
pub trait ConfigDbConnector: Send + Sync {
    /// Establishes a new reader.
    async fn connect(&self) -> BgpCfgResult<Box<dyn ConfigDbReader>>;
}

/// Redis connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Redis server hostname or IP
    pub host: String,
    /// Redis server port
    pub port: u16,
    /// Database number
    pub db: i64,
}

impl RedisConfig {
    /// Creates a new Redis configuration.
    pub fn new(host: impl Into<String>, port: u16, db: i64) -> Self {
        Self {
            host: host.into(),
            port,
            db,
        }
    }

    /// Creates a configuration for one of the well-known SONiC databases.
    pub fn for_db(host: impl Into<String>, port: u16, db: DbId) -> Self {
        Self::new(host, port, db.id())
    }

    /// Returns the Redis connection URI.
    pub fn uri(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }

    /// Opens a managed connection.
    pub async fn open(&self) -> BgpCfgResult<ConnectionManager> {
        let uri = self.uri();
        let client = redis::Client::open(uri.clone())
            .map_err(|e| BgpCfgError::database("connect", format!("{}: {}", uri, e)))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| BgpCfgError::database("connect", format!("{}: {}", uri, e)))?;
        info!("Connected to Redis: {}:{} (db={})", self.host, self.port, self.db);
        Ok(connection)
    }
}

/// Redis-backed [`ConfigDbReader`].
pub struct RedisConfigDb {
    connection: ConnectionManager,
}

#[async_trait]
impl ConfigDbReader for RedisConfigDb {
    async fn hget(&mut self, key: &str, field: &str) -> BgpCfgResult<Option<String>> {
        self.connection
            .hget(key, field)
            .await
            .map_err(|e| BgpCfgError::database("hget", format!("{} {}: {}", key, field, e)))
    }
}

/// Connector producing [`RedisConfigDb`] readers.
#[derive(Debug, Clone)]
pub struct RedisConfigDbConnector {
    config: RedisConfig,
}

impl RedisConfigDbConnector {
    /// Creates a connector for the given Redis configuration.
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigDbConnector for RedisConfigDbConnector {
    async fn connect(&self) -> BgpCfgResult<Box<dyn ConfigDbReader>> {
        let connection = self.config.open().await?;
        Ok(Box::new(RedisConfigDb { connection }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_uri() {
        let config = RedisConfig::for_db("127.0.0.1", 6379, DbId::ConfigDb);
        assert_eq!(config.uri(), "redis://127.0.0.1:6379/4");

        let appl = RedisConfig::for_db("localhost", 6380, DbId::ApplDb);
        assert_eq!(appl.uri(), "redis://localhost:6380/0");
    }

    #[tokio::test]
    async fn test_connect_failure_is_database_error() {
        let connector = RedisConfigDbConnector::new(RedisConfig::new("bad host name", 1, 4));
        match connector.connect().await {
            Err(BgpCfgError::Database { operation, .. }) => assert_eq!(operation, "connect"),
            Err(other) => panic!("Expected Database error, got {:?}", other),
            Ok(_) => panic!("Expected connection failure"),
        }
    }
}
