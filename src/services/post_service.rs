// PostService - write side: posts, comments and follow rows
// The acting user is always passed in explicitly; nothing here reads ambient state.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::core::PostId;
use crate::error::{AppError, AppResult};
use crate::forms::{CleanPost, CommentForm, FormErrors, PostForm};
use crate::infrastructure::database::DatabaseInterface;
use crate::models::{Comment, Group, NewComment, NewPost, Post, PostChanges, User};
use crate::services::feed_service::{FeedService, PostDetailView};

const INVALID_GROUP: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Context for the create/edit form
#[derive(Debug, Clone, Serialize)]
pub struct PostFormView {
    pub is_edit: bool,
    pub post_id: Option<PostId>,
    pub form: PostForm,
    pub errors: FormErrors,
    /// Choices for the group field
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone)]
pub enum CreatePostOutcome {
    Created(Post),
    Invalid(PostFormView),
}

#[derive(Debug, Clone)]
pub enum EditFormOutcome {
    Form(PostFormView),
    /// The viewer is not the author and gets the detail page instead
    ReadOnly(PostDetailView),
}

#[derive(Debug, Clone)]
pub enum EditPostOutcome {
    Updated(Post),
    Invalid(PostFormView),
    ReadOnly(PostDetailView),
}

#[derive(Debug, Clone)]
pub enum CommentOutcome {
    Added(Comment),
    /// Invalid submission; nothing was stored
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    SelfFollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    NotFollowing,
}

#[derive(Clone)]
pub struct PostService {
    db: Arc<dyn DatabaseInterface>,
    feeds: FeedService,
}

impl PostService {
    pub fn new(db: Arc<dyn DatabaseInterface>, feeds: FeedService) -> Self {
        Self { db, feeds }
    }

    /// Empty create form
    pub async fn create_form(&self) -> AppResult<PostFormView> {
        self.form_view(PostForm::default(), FormErrors::new(), None).await
    }

    #[instrument(skip(self, author, form), fields(author = %author.username))]
    pub async fn create_post(&self, author: &User, form: PostForm) -> AppResult<CreatePostOutcome> {
        let clean = match self.validate(&form).await? {
            Ok(clean) => clean,
            Err(errors) => {
                debug!("Rejected post form: {:?}", errors);
                let view = self.form_view(form, errors, None).await?;
                return Ok(CreatePostOutcome::Invalid(view));
            }
        };

        let post = self
            .db
            .create_post(NewPost {
                author: author.id,
                text: clean.text,
                group: clean.group,
                image: clean.image,
                pub_date: Utc::now(),
            })
            .await?;

        info!("Created post {}", post.id);
        Ok(CreatePostOutcome::Created(post))
    }

    /// Pre-filled edit form, or the read-only detail for anyone but the author
    #[instrument(skip(self, editor), fields(editor = %editor.username))]
    pub async fn edit_form(&self, editor: &User, id: PostId) -> AppResult<EditFormOutcome> {
        let post = self.require_post(id).await?;
        if post.author.id != editor.id {
            return Ok(EditFormOutcome::ReadOnly(self.feeds.post_detail(id).await?));
        }

        let view = self
            .form_view(PostForm::from_post(&post), FormErrors::new(), Some(id))
            .await?;
        Ok(EditFormOutcome::Form(view))
    }

    /// Apply an edit. `pub_date` and the author never change.
    #[instrument(skip(self, editor, form), fields(editor = %editor.username))]
    pub async fn edit_post(
        &self,
        editor: &User,
        id: PostId,
        form: PostForm,
    ) -> AppResult<EditPostOutcome> {
        let post = self.require_post(id).await?;
        if post.author.id != editor.id {
            debug!("User {} may not edit post {}", editor.id, id);
            return Ok(EditPostOutcome::ReadOnly(self.feeds.post_detail(id).await?));
        }

        let clean = match self.validate(&form).await? {
            Ok(clean) => clean,
            Err(errors) => {
                let view = self.form_view(form, errors, Some(id)).await?;
                return Ok(EditPostOutcome::Invalid(view));
            }
        };

        let updated = self
            .db
            .update_post(
                id,
                PostChanges {
                    text: clean.text,
                    group: clean.group,
                    image: clean.image,
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found("Post", id))?;

        info!("Updated post {}", id);
        Ok(EditPostOutcome::Updated(updated))
    }

    /// Append a comment. Blank text is dropped without an error.
    #[instrument(skip(self, author, form), fields(author = %author.username))]
    pub async fn add_comment(
        &self,
        author: &User,
        post_id: PostId,
        form: CommentForm,
    ) -> AppResult<CommentOutcome> {
        let post = self.require_post(post_id).await?;

        let text = match form.clean() {
            Ok(text) => text,
            Err(errors) => {
                debug!("Dropped comment on post {}: {:?}", post.id, errors);
                return Ok(CommentOutcome::Dropped);
            }
        };

        let comment = self
            .db
            .create_comment(NewComment {
                post: post.id,
                author: author.id,
                text,
                created: Utc::now(),
            })
            .await?;
        Ok(CommentOutcome::Added(comment))
    }

    #[instrument(skip(self, user), fields(user = %user.username))]
    pub async fn follow(&self, user: &User, username: &str) -> AppResult<FollowOutcome> {
        let author = self.require_user(username).await?;
        if author.id == user.id {
            return Ok(FollowOutcome::SelfFollow);
        }
        if self.db.follow_exists(user.id, author.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        // A concurrent follow can still win the race; the unique index decides
        if self.db.create_follow(user.id, author.id).await? {
            info!("{} now follows {}", user.username, author.username);
            Ok(FollowOutcome::Followed)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    #[instrument(skip(self, user), fields(user = %user.username))]
    pub async fn unfollow(&self, user: &User, username: &str) -> AppResult<UnfollowOutcome> {
        let author = self.require_user(username).await?;
        if self.db.delete_follow(user.id, author.id).await? {
            info!("{} unfollowed {}", user.username, author.username);
            Ok(UnfollowOutcome::Unfollowed)
        } else {
            Ok(UnfollowOutcome::NotFollowing)
        }
    }

    async fn require_post(&self, id: PostId) -> AppResult<Post> {
        self.db
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post", id))
    }

    async fn require_user(&self, username: &str) -> AppResult<User> {
        self.db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User", username))
    }

    /// Field checks plus the group lookup. The outer error is a store failure.
    async fn validate(&self, form: &PostForm) -> AppResult<Result<CleanPost, FormErrors>> {
        let (clean, mut errors) = match form.clean() {
            Ok(clean) => (Some(clean), FormErrors::new()),
            Err(errors) => (None, errors),
        };

        if let Some(group) = form.group {
            if self.db.get_group(group).await?.is_none() {
                errors.add("group", INVALID_GROUP);
            }
        }

        match clean {
            Some(clean) if errors.is_empty() => Ok(Ok(clean)),
            _ => Ok(Err(errors)),
        }
    }

    async fn form_view(
        &self,
        form: PostForm,
        errors: FormErrors,
        post_id: Option<PostId>,
    ) -> AppResult<PostFormView> {
        Ok(PostFormView {
            is_edit: post_id.is_some(),
            post_id,
            form,
            errors,
            groups: self.db.list_groups().await?,
        })
    }
}
