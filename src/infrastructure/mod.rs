// Infrastructure modules
pub mod cache;            // LRU map used by the page cache
pub mod database;         // Store interface and listing filters
pub mod middleware;       // Viewer resolution and extractors
pub mod page_cache;       // TTL cache for feed pages
pub mod sqlite_database;  // SQLite implementation of the store
pub mod viewer;           // Viewer context

pub use database::{DatabaseInterface, Inserted, PostFilter, PostOrder};
pub use page_cache::{DisabledPageCache, FeedKey, PageCache, PageKey, TtlPageCache};
pub use sqlite_database::SqliteDatabase;
pub use viewer::ViewerContext;
