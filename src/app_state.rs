use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    infrastructure::{
        database::DatabaseInterface,
        middleware::HasViewerDirectory,
        page_cache::{DisabledPageCache, PageCache, TtlPageCache},
        sqlite_database::SqliteDatabase,
    },
    services::{AdminService, FeedService, PostService},
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseInterface>,
    pub feeds: FeedService,
    pub posts: PostService,
    pub admin: AdminService,
    pub config: Arc<Config>,
    staff: Arc<HashSet<String>>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize database
        let database =
            SqliteDatabase::connect(&config.database.url, config.database.max_connections).await?;
        database.initialize().await?;
        let database: Arc<dyn DatabaseInterface> = Arc::new(database);

        let page_cache: Arc<dyn PageCache> = if config.cache.enabled {
            info!(
                "Page cache enabled: {} pages for {:?}",
                config.cache.capacity,
                config.cache.ttl()
            );
            Arc::new(TtlPageCache::new(config.cache.capacity, config.cache.ttl()))
        } else {
            Arc::new(DisabledPageCache)
        };

        Ok(Self::from_parts(database, page_cache, config))
    }

    /// Assemble the services over an existing store and page cache
    pub fn from_parts(
        db: Arc<dyn DatabaseInterface>,
        page_cache: Arc<dyn PageCache>,
        config: Config,
    ) -> Self {
        let feeds = FeedService::new(db.clone(), page_cache, &config.feed);
        let posts = PostService::new(db.clone(), feeds.clone());
        let admin = AdminService::new(db.clone(), feeds.clone());
        let staff = config.auth.staff_usernames.iter().cloned().collect();

        Self {
            db,
            feeds,
            posts,
            admin,
            config: Arc::new(config),
            staff: Arc::new(staff),
        }
    }
}

impl HasViewerDirectory for AppState {
    fn database(&self) -> &Arc<dyn DatabaseInterface> {
        &self.db
    }

    fn is_staff(&self, username: &str) -> bool {
        self.staff.contains(username)
    }
}
