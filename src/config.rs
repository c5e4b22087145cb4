//! Runtime configuration for the response cache and the HTTP transport.
//!
//! Cache settings default from the environment:
//! - `WBDATA_CACHE_PATH`: cache directory (default: under the platform cache dir)
//! - `WBDATA_CACHE_TTL_DAYS`: days to keep responses (default: 7)
//! - `WBDATA_CACHE_MAX_SIZE`: maximum number of cached responses (default: 100)

use std::path::PathBuf;
use std::time::Duration;

pub const ENV_CACHE_PATH: &str = "WBDATA_CACHE_PATH";
pub const ENV_CACHE_TTL_DAYS: &str = "WBDATA_CACHE_TTL_DAYS";
pub const ENV_CACHE_MAX_SIZE: &str = "WBDATA_CACHE_MAX_SIZE";

pub const DEFAULT_TTL_DAYS: u32 = 7;
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Where and how long responses are cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub ttl_days: u32,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            ttl_days: DEFAULT_TTL_DAYS,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl CacheConfig {
    /// Read the `WBDATA_CACHE_*` variables. Values that don't parse fall back
    /// to the defaults with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = lookup(ENV_CACHE_PATH)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_path);
        Self {
            path,
            ttl_days: parse_or_default(ENV_CACHE_TTL_DAYS, lookup(ENV_CACHE_TTL_DAYS), DEFAULT_TTL_DAYS),
            max_size: parse_or_default(ENV_CACHE_MAX_SIZE, lookup(ENV_CACHE_MAX_SIZE), DEFAULT_MAX_SIZE),
        }
    }

    /// Maximum age of an entry.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_days) * 24 * 60 * 60)
    }
}

fn parse_or_default<T: std::str::FromStr + std::fmt::Display>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> T {
    match raw {
        None => default,
        Some(s) => s.trim().parse().unwrap_or_else(|_| {
            log::warn!("Couldn't parse {name} value {s:?}, defaulting to {default}");
            default
        }),
    }
}

/// `<platform cache dir>/wbdata/<crate version>`, or a relative
/// `.wbdata-cache/<crate version>` when the platform has none.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("wbdata"))
        .unwrap_or_else(|| PathBuf::from(".wbdata-cache"))
        .join(env!("CARGO_PKG_VERSION"))
}

/// HTTP client settings and the retry policy for connection failures.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Total request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Attempts per request, including the first one.
    pub max_tries: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub base_delay: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_tries: 3,
            base_delay: Duration::from_millis(100),
            user_agent: concat!("wbdata-rs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = CacheConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.ttl_days, 7);
        assert_eq!(cfg.max_size, 100);
        assert!(cfg.path.ends_with(env!("CARGO_PKG_VERSION")));
        assert_eq!(cfg.ttl(), Duration::from_secs(7 * 86_400));
    }

    #[test]
    fn env_overrides() {
        let cfg = CacheConfig::from_lookup(lookup(&[
            (ENV_CACHE_PATH, "/tmp/wb/cache"),
            (ENV_CACHE_TTL_DAYS, "2"),
            (ENV_CACHE_MAX_SIZE, " 5 "),
        ]));
        assert_eq!(cfg.path, PathBuf::from("/tmp/wb/cache"));
        assert_eq!(cfg.ttl_days, 2);
        assert_eq!(cfg.max_size, 5);
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = CacheConfig::from_lookup(lookup(&[
            (ENV_CACHE_TTL_DAYS, "a week"),
            (ENV_CACHE_MAX_SIZE, "-1"),
        ]));
        assert_eq!(cfg.ttl_days, DEFAULT_TTL_DAYS);
        assert_eq!(cfg.max_size, DEFAULT_MAX_SIZE);
    }

    #[test]
    fn transport_defaults() {
        let cfg = TransportConfig::default();
        assert_eq!(cfg.max_tries, 3);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert!(cfg.user_agent.starts_with("wbdata-rs/"));
    }
}
