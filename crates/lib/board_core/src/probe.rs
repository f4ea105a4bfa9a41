//! Read-only diagnostics against registered Redis servers.
//!
//! The board only ever issues `PING` and `INFO`. [`RedisProbe`] is the seam
//! the API and the chat handlers depend on; [`RedisClient`] is the real
//! implementation backed by the `redis` crate.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

/// Default upper bound for a single diagnostic round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Where and how to connect to a Redis server.
#[derive(Clone, PartialEq, Eq)]
pub struct RedisTarget {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl std::fmt::Debug for RedisTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl RedisTarget {
    /// `redis://` URL for this target, password percent-encoded.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("redis://{}:{}/", self.host, self.port))?;
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            // Only fails for URLs without a host, which cannot happen here.
            let _ = url.set_password(Some(password));
        }
        Ok(url)
    }
}

/// Diagnostic failures. Every connection-level problem collapses to
/// `Unreachable` so callers never see raw client errors.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Redis server {host} can't be connected.")]
    Unreachable { host: String },
}

impl ProbeError {
    fn unreachable(target: &RedisTarget) -> Self {
        ProbeError::Unreachable {
            host: target.host.clone(),
        }
    }
}

/// Health and metrics access to a Redis server.
#[async_trait]
pub trait RedisProbe: Send + Sync {
    /// `PING` the server.
    async fn ping(&self, target: &RedisTarget) -> Result<bool, ProbeError>;

    /// `INFO`, parsed into a JSON object.
    async fn info(&self, target: &RedisTarget) -> Result<Map<String, Value>, ProbeError>;
}

/// [`RedisProbe`] backed by a fresh connection per call.
#[derive(Debug, Clone)]
pub struct RedisClient {
    timeout: Duration,
}

impl Default for RedisClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl RedisClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn query(&self, target: &RedisTarget, command: &str) -> Result<String, ProbeError> {
        let url = target.url().map_err(|e| {
            warn!(host = %target.host, error = %e, "invalid redis address");
            ProbeError::unreachable(target)
        })?;

        let round_trip = async {
            let client = redis::Client::open(url.as_str())?;
            let mut conn = client.get_multiplexed_async_connection().await?;
            let reply: String = redis::cmd(command).query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(reply)
        };

        match timeout(self.timeout, round_trip).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                debug!(host = %target.host, port = target.port, error = %e, command, "redis command failed");
                Err(ProbeError::unreachable(target))
            }
            Err(_) => {
                debug!(host = %target.host, port = target.port, command, "redis command timed out");
                Err(ProbeError::unreachable(target))
            }
        }
    }
}

#[async_trait]
impl RedisProbe for RedisClient {
    async fn ping(&self, target: &RedisTarget) -> Result<bool, ProbeError> {
        let reply = self.query(target, "PING").await?;
        Ok(reply.eq_ignore_ascii_case("PONG"))
    }

    async fn info(&self, target: &RedisTarget) -> Result<Map<String, Value>, ProbeError> {
        let reply = self.query(target, "INFO").await?;
        Ok(parse_info(&reply))
    }
}

/// Parse the text body of an `INFO` reply.
///
/// `# Section` headers and blank lines are skipped. Integer and float values
/// become JSON numbers; `k=v,k=v` values (keyspace lines such as `db0`)
/// become nested objects; everything else stays a string.
pub fn parse_info(text: &str) -> Map<String, Value> {
    let mut info = Map::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        info.insert(key.to_string(), info_value(value));
    }
    info
}

fn info_value(raw: &str) -> Value {
    if raw.contains('=') && !raw.contains(' ') {
        let mut nested = Map::new();
        for pair in raw.split(',') {
            match pair.split_once('=') {
                Some((k, v)) => {
                    nested.insert(k.to_string(), scalar(v));
                }
                None => return Value::String(raw.to_string()),
            }
        }
        return Value::Object(nested);
    }
    scalar(raw)
}

fn scalar(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>()
        && let Some(n) = Number::from_f64(f)
    {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const INFO: &str = "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\ntcp_port:6379\r\nuptime_in_seconds:1234\r\n\r\n# Memory\r\nmem_fragmentation_ratio:1.53\r\nmaxmemory_policy:noeviction\r\n\r\n# Keyspace\r\ndb0:keys=12,expires=0,avg_ttl=0\r\n";

    #[test]
    fn parses_info_sections() {
        let info = parse_info(INFO);
        assert_eq!(json!("7.2.4"), info["redis_version"]);
        assert_eq!(json!(6379), info["tcp_port"]);
        assert_eq!(json!(1234), info["uptime_in_seconds"]);
        assert_eq!(json!(1.53), info["mem_fragmentation_ratio"]);
        assert_eq!(json!("noeviction"), info["maxmemory_policy"]);
        assert_eq!(json!({"keys": 12, "expires": 0, "avg_ttl": 0}), info["db0"]);
        assert!(!info.contains_key("# Server"));
    }

    #[test]
    fn url_encodes_password() {
        let target = RedisTarget {
            host: "10.0.0.1".into(),
            port: 6380,
            password: Some("p@ss word".into()),
        };
        let url = target.url().unwrap();
        assert_eq!("10.0.0.1", url.host_str().unwrap());
        assert_eq!(Some(6380), url.port());
        assert_eq!(Some("p%40ss%20word"), url.password());
    }

    #[test]
    fn debug_redacts_password() {
        let target = RedisTarget {
            host: "10.0.0.1".into(),
            port: 6379,
            password: Some("hunter2".into()),
        };
        assert!(!format!("{target:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = RedisClient::new(Duration::from_millis(500));
        let target = RedisTarget {
            host: "127.0.0.1".into(),
            port,
            password: None,
        };
        let err = client.ping(&target).await.unwrap_err();
        assert_eq!("Redis server 127.0.0.1 can't be connected.", err.to_string());
    }
}
