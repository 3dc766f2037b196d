// Database Interface - Repository seam between the services and the store
// Services only speak this trait; SQLite is the shipped implementation

use async_trait::async_trait;

use crate::core::{GroupId, PostId, UserId};
use crate::error::AppResult;
use crate::models::{Comment, Group, NewComment, NewGroup, NewPost, Post, PostChanges, User};

/// Which posts a listing selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(GroupId),
    Author(UserId),
    /// Posts whose author is followed by this user
    FollowedBy(UserId),
    /// Case-insensitive substring match on the text, Unicode letters included
    TextContains(String),
}

/// Listing order. Ties on `pub_date` fall back to the row id in the same
/// direction, so equal timestamps list in reverse insertion order when
/// newest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Outcome of an insert guarded by a uniqueness constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inserted<T> {
    Created(T),
    Duplicate,
}

#[async_trait]
pub trait DatabaseInterface: Send + Sync {
    /// Cheap round trip used by the health endpoint
    async fn health_check(&self) -> AppResult<()>;

    // Users (identity directory)
    async fn create_user(&self, username: &str) -> AppResult<Inserted<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    /// Removes the user together with their posts, comments and follow rows
    async fn delete_user(&self, id: UserId) -> AppResult<bool>;

    // Groups
    async fn create_group(&self, group: NewGroup) -> AppResult<Inserted<Group>>;
    async fn get_group(&self, id: GroupId) -> AppResult<Option<Group>>;
    async fn get_group_by_slug(&self, slug: &str) -> AppResult<Option<Group>>;
    async fn list_groups(&self) -> AppResult<Vec<Group>>;
    /// Posts of the group survive with a null group
    async fn delete_group(&self, id: GroupId) -> AppResult<bool>;

    // Posts
    async fn create_post(&self, post: NewPost) -> AppResult<Post>;
    async fn get_post(&self, id: PostId) -> AppResult<Option<Post>>;
    async fn update_post(&self, id: PostId, changes: PostChanges) -> AppResult<Option<Post>>;
    async fn delete_post(&self, id: PostId) -> AppResult<bool>;
    async fn list_posts(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<Post>>;
    async fn count_posts(&self, filter: &PostFilter) -> AppResult<u64>;

    // Comments
    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment>;
    /// Comments of a post in insertion order
    async fn list_comments(&self, post: PostId) -> AppResult<Vec<Comment>>;
    async fn count_comments(&self, post: PostId) -> AppResult<u64>;

    // Follows
    /// Returns false when the row already exists or `user == author`
    async fn create_follow(&self, user: UserId, author: UserId) -> AppResult<bool>;
    async fn delete_follow(&self, user: UserId, author: UserId) -> AppResult<bool>;
    async fn follow_exists(&self, user: UserId, author: UserId) -> AppResult<bool>;
    async fn count_follows(&self, user: UserId, author: UserId) -> AppResult<u64>;
}
