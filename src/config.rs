use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub feed: FeedConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Page cache for the global feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub posts_per_page: usize,
    pub title_length: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Usernames allowed on the admin routes
    pub staff_usernames: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 20,
            capacity: 64,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            posts_per_page: 10,
            title_length: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let feed = FeedConfig {
            posts_per_page: parse_var("POSTS_PER_PAGE", 10)?,
            title_length: parse_var("TITLE_LENGTH", 30)?,
        };
        if feed.posts_per_page == 0 {
            anyhow::bail!("POSTS_PER_PAGE must be a positive integer");
        }

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:blog_feed.db".to_string()),
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("SERVER_PORT", 3000)?,
            },
            cache: CacheConfig {
                enabled: parse_var("PAGE_CACHE_ENABLED", true)?,
                ttl_secs: parse_var("PAGE_CACHE_TTL_SECS", 20)?,
                capacity: parse_var("PAGE_CACHE_CAPACITY", 64)?,
            },
            feed,
            auth: AuthConfig {
                staff_usernames: env::var("STAFF_USERNAMES")
                    .map(|raw| split_list(&raw))
                    .unwrap_or_default(),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Configuration for tests and the seeder: in-memory store, cache off
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            cache: CacheConfig {
                enabled: false,
                ..CacheConfig::default()
            },
            feed: FeedConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_skips_blanks() {
        assert_eq!(split_list(" admin, ,editor,"), vec!["admin", "editor"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = Config::in_memory();
        assert_eq!(config.feed.posts_per_page, 10);
        assert_eq!(config.feed.title_length, 30);
        assert_eq!(config.cache.ttl(), Duration::from_secs(20));
        assert!(!config.cache.enabled);
    }
}
