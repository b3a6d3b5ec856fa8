use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{Error, RefreshStore};

const KEY_PREFIX: &str = "folio:refresh:";

fn key(subject: Uuid) -> String {
    format!("{KEY_PREFIX}{subject}")
}

// Redis drops a key once its EXAT second is reached, and the token is
// still valid during its `exp` second.
const fn expire_at(expires_at: i64) -> i64 {
    expires_at.saturating_add(1)
}

/// Refresh tokens kept in Redis under `folio:refresh:<subject>`, written with
/// `SET ... EXAT` so the key outlives the token's `exp` second.
#[derive(Clone)]
pub struct RedisRefreshStore {
    conn: ConnectionManager,
}

impl RedisRefreshStore {
    /// Connect to `url` (for example `redis://127.0.0.1:6379/0`).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl RefreshStore for RedisRefreshStore {
    async fn put(&self, subject: Uuid, token: &str, expires_at: i64) -> Result<(), Error> {
        let span = info_span!("cache.query", db.system = "redis", db.operation = "SET");
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key(subject))
            .arg(token)
            .arg("EXAT")
            .arg(expire_at(expires_at))
            .query_async::<()>(&mut conn)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn get(&self, subject: Uuid) -> Result<Option<String>, Error> {
        let span = info_span!("cache.query", db.system = "redis", db.operation = "GET");
        let mut conn = self.conn.clone();
        let token: Option<String> = redis::cmd("GET")
            .arg(key(subject))
            .query_async(&mut conn)
            .instrument(span)
            .await?;
        Ok(token)
    }

    async fn delete(&self, subject: Uuid) -> Result<(), Error> {
        let span = info_span!("cache.query", db.system = "redis", db.operation = "DEL");
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key(subject))
            .query_async::<()>(&mut conn)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_subject() {
        let subject = Uuid::nil();
        assert_eq!(
            key(subject),
            "folio:refresh:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn keys_expire_after_the_token_expiry_second() {
        assert_eq!(expire_at(1_700_000_000), 1_700_000_001);
        assert_eq!(expire_at(i64::MAX), i64::MAX);
    }
}
