use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row};
use std::str::FromStr;
use tracing::{debug, info};

use crate::core::{
    current_time_millis, millis_to_datetime, CommentId, GroupId, PostId, UserId,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{DatabaseInterface, Inserted, PostFilter, PostOrder};
use crate::models::{
    Comment, Group, GroupRef, NewComment, NewGroup, NewPost, Post, PostChanges, PostImage, User,
    UserRef,
};

const POST_COLUMNS: &str = "SELECT p.id, p.text, p.pub_date, p.author_id, u.username AS author_username, \
     p.group_id, g.title AS group_title, g.slug AS group_slug, \
     p.image_name, p.image_content_type, p.image_data \
     FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id";

const COMMENT_COLUMNS: &str = "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created \
     FROM comments c \
     JOIN users u ON u.id = c.author_id";

/// SQLite implementation of the content store
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connect to `url` with foreign keys enforced. In-memory databases are
    /// pinned to one long-lived connection so every query sees the same data.
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid database URL {}: {}", url, e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to {}: {}", url, e)))?;

        info!("Connected to SQLite database at {}", url);
        Ok(Self { pool })
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        let db = Self::connect("sqlite::memory:", 1).await?;
        db.initialize().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                date_joined INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS post_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL CHECK (length(trim(text)) > 0),
                search_text TEXT NOT NULL,
                pub_date INTEGER NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                group_id INTEGER REFERENCES post_groups(id) ON DELETE SET NULL,
                image_name TEXT,
                image_content_type TEXT,
                image_data BLOB
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text TEXT NOT NULL CHECK (length(trim(text)) > 0),
                created INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS follows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE (user_id, author_id),
                CHECK (user_id <> author_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_posts_pub_date ON posts(pub_date DESC, id DESC)",
            "CREATE INDEX IF NOT EXISTS idx_posts_group ON posts(group_id)",
            "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id)",
            "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, id)",
            "CREATE INDEX IF NOT EXISTS idx_follows_author ON follows(author_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;
        }

        debug!("Schema initialized");
        Ok(())
    }

    async fn fetch_post(&self, id: PostId) -> AppResult<Option<Post>> {
        let row = sqlx::query(&format!("{} WHERE p.id = ?", POST_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get post {}: {}", id, e)))?;
        Ok(row.as_ref().map(post_from_row))
    }

    async fn fetch_comment(&self, id: CommentId) -> AppResult<Option<Comment>> {
        let row = sqlx::query(&format!("{} WHERE c.id = ?", COMMENT_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get comment {}: {}", id, e)))?;
        Ok(row.as_ref().map(comment_from_row))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn push_post_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group) => {
            qb.push(" WHERE p.group_id = ");
            qb.push_bind(group.value());
        }
        PostFilter::Author(author) => {
            qb.push(" WHERE p.author_id = ");
            qb.push_bind(author.value());
        }
        PostFilter::FollowedBy(user) => {
            qb.push(" WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ");
            qb.push_bind(user.value());
            qb.push(")");
        }
        PostFilter::TextContains(needle) => {
            qb.push(" WHERE p.search_text LIKE ");
            qb.push_bind(format!("%{}%", escape_like(&fold_case(needle))));
            qb.push(" ESCAPE '\\'");
        }
    }
}

/// SQLite's LIKE only folds ASCII, so search text is lowercased up front
fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: UserId::new(row.get("id")),
        username: row.get("username"),
        date_joined: millis_to_datetime(row.get("date_joined")),
    }
}

fn group_from_row(row: &SqliteRow) -> Group {
    Group {
        id: GroupId::new(row.get("id")),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
    }
}

fn post_from_row(row: &SqliteRow) -> Post {
    let group = row.get::<Option<i64>, _>("group_id").map(|id| GroupRef {
        id: GroupId::new(id),
        title: row.get::<Option<String>, _>("group_title").unwrap_or_default(),
        slug: row.get::<Option<String>, _>("group_slug").unwrap_or_default(),
    });

    let image = row
        .get::<Option<String>, _>("image_name")
        .map(|file_name| PostImage {
            file_name,
            content_type: row
                .get::<Option<String>, _>("image_content_type")
                .unwrap_or_default(),
            data: row.get::<Option<Vec<u8>>, _>("image_data").unwrap_or_default(),
        });

    Post {
        id: PostId::new(row.get("id")),
        text: row.get("text"),
        pub_date: millis_to_datetime(row.get("pub_date")),
        author: UserRef {
            id: UserId::new(row.get("author_id")),
            username: row.get("author_username"),
        },
        group,
        image,
    }
}

fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: CommentId::new(row.get("id")),
        post: PostId::new(row.get("post_id")),
        author: UserRef {
            id: UserId::new(row.get("author_id")),
            username: row.get("author_username"),
        },
        text: row.get("text"),
        created: millis_to_datetime(row.get("created")),
    }
}

#[async_trait]
impl DatabaseInterface for SqliteDatabase {
    /// Health check to verify database connectivity
    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }

    async fn create_user(&self, username: &str) -> AppResult<Inserted<User>> {
        let now = current_time_millis();
        let result = sqlx::query("INSERT INTO users (username, date_joined) VALUES (?, ?)")
            .bind(username)
            .bind(now)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(Inserted::Created(User {
                id: UserId::new(done.last_insert_rowid()),
                username: username.to_string(),
                date_joined: millis_to_datetime(now),
            })),
            Err(e) if is_unique_violation(&e) => Ok(Inserted::Duplicate),
            Err(e) => Err(AppError::DatabaseError(format!(
                "Failed to create user {}: {}",
                username, e
            ))),
        }
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, date_joined FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to get user {}: {}", username, e))
            })?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn delete_user(&self, id: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete user {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_group(&self, group: NewGroup) -> AppResult<Inserted<Group>> {
        let result =
            sqlx::query("INSERT INTO post_groups (title, slug, description) VALUES (?, ?, ?)")
                .bind(&group.title)
                .bind(&group.slug)
                .bind(&group.description)
                .execute(&self.pool)
                .await;

        match result {
            Ok(done) => Ok(Inserted::Created(Group {
                id: GroupId::new(done.last_insert_rowid()),
                title: group.title,
                slug: group.slug,
                description: group.description,
            })),
            Err(e) if is_unique_violation(&e) => Ok(Inserted::Duplicate),
            Err(e) => Err(AppError::DatabaseError(format!(
                "Failed to create group {}: {}",
                group.slug, e
            ))),
        }
    }

    async fn get_group(&self, id: GroupId) -> AppResult<Option<Group>> {
        let row = sqlx::query("SELECT id, title, slug, description FROM post_groups WHERE id = ?")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get group {}: {}", id, e)))?;
        Ok(row.as_ref().map(group_from_row))
    }

    async fn get_group_by_slug(&self, slug: &str) -> AppResult<Option<Group>> {
        let row =
            sqlx::query("SELECT id, title, slug, description FROM post_groups WHERE slug = ?")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to get group {}: {}", slug, e))
                })?;
        Ok(row.as_ref().map(group_from_row))
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let rows =
            sqlx::query("SELECT id, title, slug, description FROM post_groups ORDER BY title, id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to list groups: {}", e)))?;
        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn delete_group(&self, id: GroupId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM post_groups WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete group {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_post(&self, post: NewPost) -> AppResult<Post> {
        let (image_name, image_content_type, image_data) = match post.image {
            Some(image) => (Some(image.file_name), Some(image.content_type), Some(image.data)),
            None => (None, None, None),
        };

        let result = sqlx::query(
            "INSERT INTO posts (text, search_text, pub_date, author_id, group_id, image_name, image_content_type, image_data) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&post.text)
        .bind(fold_case(&post.text))
        .bind(post.pub_date.timestamp_millis())
        .bind(post.author.value())
        .bind(post.group.map(GroupId::value))
        .bind(image_name)
        .bind(image_content_type)
        .bind(image_data)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create post: {}", e)))?;

        let id = PostId::new(result.last_insert_rowid());
        self.fetch_post(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Post {} vanished after insert", id)))
    }

    async fn get_post(&self, id: PostId) -> AppResult<Option<Post>> {
        self.fetch_post(id).await
    }

    async fn update_post(&self, id: PostId, changes: PostChanges) -> AppResult<Option<Post>> {
        let result = match changes.image {
            Some(image) => sqlx::query(
                "UPDATE posts SET text = ?, search_text = ?, group_id = ?, image_name = ?, image_content_type = ?, \
                 image_data = ? WHERE id = ?",
            )
            .bind(&changes.text)
            .bind(fold_case(&changes.text))
            .bind(changes.group.map(GroupId::value))
            .bind(image.file_name)
            .bind(image.content_type)
            .bind(image.data)
            .bind(id.value()),
            None => sqlx::query("UPDATE posts SET text = ?, search_text = ?, group_id = ? WHERE id = ?")
                .bind(&changes.text)
                .bind(fold_case(&changes.text))
                .bind(changes.group.map(GroupId::value))
                .bind(id.value()),
        }
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update post {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_post(id).await
    }

    async fn delete_post(&self, id: PostId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete post {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Sqlite>::new(POST_COLUMNS);
        push_post_filter(&mut qb, filter);

        match order {
            PostOrder::NewestFirst => qb.push(" ORDER BY p.pub_date DESC, p.id DESC"),
            PostOrder::OldestFirst => qb.push(" ORDER BY p.pub_date ASC, p.id ASC"),
        };

        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list posts: {}", e)))?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn count_posts(&self, filter: &PostFilter) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS count FROM posts p");
        push_post_filter(&mut qb, filter);

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count posts: {}", e)))?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment> {
        let result =
            sqlx::query("INSERT INTO comments (post_id, author_id, text, created) VALUES (?, ?, ?, ?)")
                .bind(comment.post.value())
                .bind(comment.author.value())
                .bind(&comment.text)
                .bind(comment.created.timestamp_millis())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!(
                        "Failed to create comment on post {}: {}",
                        comment.post, e
                    ))
                })?;

        let id = CommentId::new(result.last_insert_rowid());
        self.fetch_comment(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Comment {} vanished after insert", id)))
    }

    async fn list_comments(&self, post: PostId) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query(&format!("{} WHERE c.post_id = ? ORDER BY c.id", COMMENT_COLUMNS))
            .bind(post.value())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to list comments of post {}: {}", post, e))
            })?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn count_comments(&self, post: PostId) -> AppResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM comments WHERE post_id = ?")
            .bind(post.value())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to count comments of post {}: {}", post, e))
            })?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn create_follow(&self, user: UserId, author: UserId) -> AppResult<bool> {
        if user == author {
            return Ok(false);
        }
        let result = sqlx::query("INSERT OR IGNORE INTO follows (user_id, author_id) VALUES (?, ?)")
            .bind(user.value())
            .bind(author.value())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to follow {} -> {}: {}", user, author, e))
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&self, user: UserId, author: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user.value())
            .bind(author.value())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to unfollow {} -> {}: {}", user, author, e))
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn follow_exists(&self, user: UserId, author: UserId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user.value())
            .bind(author.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to check follow existence: {}", e))
            })?;
        Ok(row.is_some())
    }

    async fn count_follows(&self, user: UserId, author: UserId) -> AppResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM follows WHERE user_id = ? AND author_id = ?",
        )
        .bind(user.value())
        .bind(author.value())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count follows: {}", e)))?;
        Ok(row.get::<i64, _>("count") as u64)
    }
}
