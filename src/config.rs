//! Relay configuration parsed from environment variables.
//!
//! Every knob has a default; unparseable or zero values fall back to it so a
//! typo in the environment never prevents the relay from starting.

use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_STALE_AFTER_SECS: u64 = 60;
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// How often each live party scans for abandoned cursors.
    pub sweep_interval: Duration,
    /// A participant idle for longer than this is evicted by the sweep.
    pub stale_after: Duration,
    /// Outbound queue depth per connection. Overflow drops messages for that
    /// connection only.
    pub client_queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Build relay config from environment variables.
    ///
    /// Optional:
    /// - `HOST`: default `0.0.0.0`
    /// - `PORT`: default 3000
    /// - `CURSOR_SWEEP_INTERVAL_SECS`: default 30
    /// - `CURSOR_STALE_AFTER_SECS`: default 60
    /// - `CURSOR_CLIENT_QUEUE_CAPACITY`: default 256
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build relay config from an arbitrary key lookup.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("HOST")
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_owned());

        Self {
            host,
            port: parse_nonzero(lookup("PORT"), DEFAULT_PORT),
            sweep_interval: Duration::from_secs(parse_nonzero(
                lookup("CURSOR_SWEEP_INTERVAL_SECS"),
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
            stale_after: Duration::from_secs(parse_nonzero(lookup("CURSOR_STALE_AFTER_SECS"), DEFAULT_STALE_AFTER_SECS)),
            client_queue_capacity: parse_nonzero(
                lookup("CURSOR_CLIENT_QUEUE_CAPACITY"),
                DEFAULT_CLIENT_QUEUE_CAPACITY,
            ),
        }
    }

    /// Socket address string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_nonzero<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Default + PartialEq + Copy,
{
    raw.and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| *v != T::default())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
