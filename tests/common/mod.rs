#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use blog_feed::{
    app_state::AppState,
    config::Config,
    infrastructure::{
        database::{DatabaseInterface, Inserted},
        page_cache::{DisabledPageCache, PageCache, TtlPageCache},
        sqlite_database::SqliteDatabase,
    },
    models::{Group, NewGroup, User},
};

pub async fn state_with_cache(page_cache: Arc<dyn PageCache>, staff: &[&str]) -> AppState {
    let db: Arc<dyn DatabaseInterface> = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
    let mut config = Config::in_memory();
    config.auth.staff_usernames = staff.iter().map(|s| s.to_string()).collect();
    AppState::from_parts(db, page_cache, config)
}

pub async fn state() -> AppState {
    state_with_cache(Arc::new(DisabledPageCache), &[]).await
}

pub async fn cached_state() -> AppState {
    state_with_cache(Arc::new(TtlPageCache::new(64, Duration::from_secs(20))), &[]).await
}

pub async fn user(state: &AppState, username: &str) -> User {
    match state.db.create_user(username).await.unwrap() {
        Inserted::Created(user) => user,
        Inserted::Duplicate => panic!("user {} already exists", username),
    }
}

pub async fn group(state: &AppState, slug: &str) -> Group {
    let new_group = NewGroup {
        title: format!("Group {}", slug),
        slug: slug.to_string(),
        description: "Test group".to_string(),
    };
    match state.db.create_group(new_group).await.unwrap() {
        Inserted::Created(group) => group,
        Inserted::Duplicate => panic!("group {} already exists", slug),
    }
}
