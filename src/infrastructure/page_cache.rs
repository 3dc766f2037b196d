// Page Cache - short-lived cache for rendered feed pages
// Entries expire after a fixed TTL and are never invalidated by writes, so a
// new post shows up on a cached page only once the entry has aged out.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::infrastructure::cache::Cache;
use crate::models::Post;
use crate::pagination::Page;

/// Feeds that go through the page cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKey {
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub feed: FeedKey,
    pub page: i64,
}

impl PageKey {
    pub fn new(feed: FeedKey, page: i64) -> Self {
        Self { feed, page }
    }
}

#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &PageKey) -> Option<Page<Post>>;
    async fn put(&self, key: PageKey, page: Page<Post>);
}

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry {
    page: Page<Post>,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(page: Page<Post>, ttl: Duration) -> Self {
        Self {
            page,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// LRU-bounded page cache whose entries live for `ttl`
pub struct TtlPageCache {
    entries: Mutex<Cache<PageKey, CacheEntry>>,
    ttl: Duration,
}

impl TtlPageCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Cache::new(capacity)),
            ttl,
        }
    }
}

#[async_trait]
impl PageCache for TtlPageCache {
    async fn get(&self, key: &PageKey) -> Option<Page<Post>> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                debug!("Page cache hit for {:?}", key);
                return Some(entry.page.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        debug!("Page cache miss for {:?}", key);
        None
    }

    async fn put(&self, key: PageKey, page: Page<Post>) {
        self.entries
            .lock()
            .await
            .insert(key, CacheEntry::new(page, self.ttl));
    }
}

/// Cache that stores nothing; every read goes to the store
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPageCache;

#[async_trait]
impl PageCache for DisabledPageCache {
    async fn get(&self, _key: &PageKey) -> Option<Page<Post>> {
        None
    }

    async fn put(&self, _key: PageKey, _page: Page<Post>) {}
}
