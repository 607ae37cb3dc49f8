//! Redis-backed [`CacheClient`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;

use super::cache::{CacheClient, CasOutcome};

/// Atomic check-and-set: replace KEYS[1] with ARGV[2] (PX ARGV[3]) only while
/// it still holds exactly ARGV[1]. Returns 1 swapped, 0 missing, -1 changed.
const CAS_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if not current then
  return 0
end
if current ~= ARGV[1] then
  return -1
end
redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
return 1
";

/// Cache client over a multiplexed, auto-reconnecting Redis connection.
///
/// The check-and-set runs server-side as a single script, so it stays atomic
/// on a shared connection where `WATCH` would not be connection-scoped.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    cas: Script,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            cas: Script::new(CAS_SCRIPT),
        }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).with_context(|| format!("invalid redis url {url}"))?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to redis")?;
        tracing::info!("connected to redis session cache");
        Ok(Self::new(conn))
    }
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let updated: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new_value: &str,
        ttl: Duration,
    ) -> Result<CasOutcome> {
        let mut conn = self.conn.clone();
        let outcome: i64 = self
            .cas
            .key(key)
            .arg(expected)
            .arg(new_value)
            .arg(millis(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(match outcome {
            1 => CasOutcome::Swapped,
            0 => CasOutcome::Missing,
            _ => CasOutcome::Changed,
        })
    }

    async fn close(&self) -> Result<()> {
        // The connection manager closes when its last clone is dropped.
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_sent_in_whole_milliseconds() {
        assert_eq!(millis(Duration::from_secs(2)), 2000);
        assert_eq!(millis(Duration::from_micros(10)), 1);
    }
}
