// AdminService - moderation, group lifecycle and the user directory
// Covers post search/removal, group create/list/delete, sign-up and user removal.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::PostId;
use crate::error::{AppError, AppResult};
use crate::forms::{FormErrors, GroupForm, SignupForm};
use crate::infrastructure::database::{DatabaseInterface, Inserted, PostFilter};
use crate::models::{Group, Post, User};
use crate::pagination::{Page, PageRequest};
use crate::services::feed_service::FeedService;

/// Result of a submitted form: either the stored record or the field errors
#[derive(Debug, Clone)]
pub enum FormOutcome<T> {
    Saved(T),
    Invalid(FormErrors),
}

#[derive(Clone)]
pub struct AdminService {
    db: Arc<dyn DatabaseInterface>,
    feeds: FeedService,
}

impl AdminService {
    pub fn new(db: Arc<dyn DatabaseInterface>, feeds: FeedService) -> Self {
        Self { db, feeds }
    }

    /// Case-insensitive text search, newest first. A blank query lists everything.
    #[instrument(skip(self))]
    pub async fn search_posts(&self, query: &str, request: PageRequest) -> AppResult<Page<Post>> {
        let query = query.trim();
        let filter = if query.is_empty() {
            PostFilter::All
        } else {
            PostFilter::TextContains(query.to_string())
        };
        self.feeds.load_page(&filter, request).await
    }

    /// Hard delete; comments go with the post
    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: PostId) -> AppResult<()> {
        if !self.db.delete_post(id).await? {
            return Err(AppError::not_found("Post", id));
        }
        info!("Deleted post {}", id);
        Ok(())
    }

    #[instrument(skip(self, form), fields(slug = %form.slug))]
    pub async fn create_group(&self, form: GroupForm) -> AppResult<FormOutcome<Group>> {
        let new_group = match form.clean() {
            Ok(new_group) => new_group,
            Err(errors) => return Ok(FormOutcome::Invalid(errors)),
        };

        match self.db.create_group(new_group).await? {
            Inserted::Created(group) => {
                info!("Created group {}", group.slug);
                Ok(FormOutcome::Saved(group))
            }
            Inserted::Duplicate => {
                let mut errors = FormErrors::new();
                errors.add("slug", "Group with this Slug already exists.");
                Ok(FormOutcome::Invalid(errors))
            }
        }
    }

    pub async fn list_groups(&self) -> AppResult<Vec<Group>> {
        self.db.list_groups().await
    }

    /// Posts of the group stay, detached from it
    #[instrument(skip(self))]
    pub async fn delete_group(&self, slug: &str) -> AppResult<()> {
        let group = self
            .db
            .get_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Group", slug))?;

        self.db.delete_group(group.id).await?;
        info!("Deleted group {}", slug);
        Ok(())
    }

    /// Sign-up: add a username to the directory
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register_user(&self, form: SignupForm) -> AppResult<FormOutcome<User>> {
        let username = match form.clean() {
            Ok(username) => username,
            Err(errors) => return Ok(FormOutcome::Invalid(errors)),
        };

        match self.db.create_user(&username).await? {
            Inserted::Created(user) => {
                info!("Registered user {}", user.username);
                Ok(FormOutcome::Saved(user))
            }
            Inserted::Duplicate => {
                let mut errors = FormErrors::new();
                errors.add("username", "A user with that username already exists.");
                Ok(FormOutcome::Invalid(errors))
            }
        }
    }

    /// Removes the user with their posts, comments and follow rows
    #[instrument(skip(self))]
    pub async fn remove_user(&self, username: &str) -> AppResult<()> {
        let user = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User", username))?;

        if !self.db.delete_user(user.id).await? {
            warn!("User {} disappeared before removal", username);
        }
        info!("Removed user {}", username);
        Ok(())
    }
}
