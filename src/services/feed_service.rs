// FeedService - read side: global, group, profile, following feeds and post detail
// Every listing is newest first and paginated; only the global feed is cached.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::FeedConfig;
use crate::core::PostId;
use crate::error::{AppError, AppResult};
use crate::forms::CommentForm;
use crate::infrastructure::database::{DatabaseInterface, PostFilter, PostOrder};
use crate::infrastructure::page_cache::{FeedKey, PageCache, PageKey};
use crate::models::{Comment, Group, Post, User};
use crate::pagination::{Page, PageRequest, Paginator};

pub const GLOBAL_FEED_TITLE: &str = "Latest updates";
pub const FOLLOWING_FEED_TITLE: &str = "Subscriptions";

#[derive(Debug, Clone, Serialize)]
pub struct FeedView {
    pub title: String,
    pub page: Page<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupFeedView {
    pub title: String,
    pub group: Group,
    pub page: Page<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub title: String,
    pub author: User,
    pub post_count: u64,
    /// True only for a signed-in viewer with a follow row to `author`
    pub following: bool,
    pub page: Page<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetailView {
    pub title: String,
    pub post: Post,
    pub author_post_count: u64,
    pub comments: Vec<Comment>,
    pub form: CommentForm,
}

#[derive(Clone)]
pub struct FeedService {
    db: Arc<dyn DatabaseInterface>,
    page_cache: Arc<dyn PageCache>,
    paginator: Paginator,
    title_length: usize,
}

impl FeedService {
    pub fn new(
        db: Arc<dyn DatabaseInterface>,
        page_cache: Arc<dyn PageCache>,
        config: &FeedConfig,
    ) -> Self {
        Self {
            db,
            page_cache,
            paginator: Paginator::new(config.posts_per_page),
            title_length: config.title_length,
        }
    }

    /// All posts. Pages are served from the page cache while fresh.
    #[instrument(skip(self))]
    pub async fn global_feed(&self, request: PageRequest) -> AppResult<FeedView> {
        let key = PageKey::new(FeedKey::Global, request.resolved());
        let page = match self.page_cache.get(&key).await {
            Some(page) => page,
            None => {
                let page = self.load_page(&PostFilter::All, request).await?;
                self.page_cache.put(key, page.clone()).await;
                page
            }
        };

        Ok(FeedView {
            title: GLOBAL_FEED_TITLE.to_string(),
            page,
        })
    }

    #[instrument(skip(self))]
    pub async fn group_feed(&self, slug: &str, request: PageRequest) -> AppResult<GroupFeedView> {
        let group = self
            .db
            .get_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Group", slug))?;

        let page = self.load_page(&PostFilter::Group(group.id), request).await?;

        Ok(GroupFeedView {
            title: group.title.clone(),
            group,
            page,
        })
    }

    #[instrument(skip(self, viewer))]
    pub async fn profile_feed(
        &self,
        username: &str,
        viewer: Option<&User>,
        request: PageRequest,
    ) -> AppResult<ProfileView> {
        let author = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User", username))?;

        let page = self.load_page(&PostFilter::Author(author.id), request).await?;
        let following = match viewer {
            Some(viewer) => self.db.follow_exists(viewer.id, author.id).await?,
            None => false,
        };

        Ok(ProfileView {
            title: author.username.clone(),
            post_count: page.total_count,
            following,
            author,
            page,
        })
    }

    #[instrument(skip(self))]
    pub async fn post_detail(&self, id: PostId) -> AppResult<PostDetailView> {
        let post = self
            .db
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post", id))?;

        let author_filter = PostFilter::Author(post.author.id);
        let (author_post_count, comments) = futures::try_join!(
            self.db.count_posts(&author_filter),
            self.db.list_comments(post.id)
        )?;

        Ok(PostDetailView {
            title: post.truncated_text(self.title_length),
            post,
            author_post_count,
            comments,
            form: CommentForm::default(),
        })
    }

    /// Posts of every author `viewer` follows
    #[instrument(skip(self, viewer), fields(viewer = %viewer.username))]
    pub async fn following_feed(&self, viewer: &User, request: PageRequest) -> AppResult<FeedView> {
        let page = self
            .load_page(&PostFilter::FollowedBy(viewer.id), request)
            .await?;

        Ok(FeedView {
            title: FOLLOWING_FEED_TITLE.to_string(),
            page,
        })
    }

    /// One page of a filtered listing, sliced by the store
    pub async fn load_page(&self, filter: &PostFilter, request: PageRequest) -> AppResult<Page<Post>> {
        match self.paginator.window(request) {
            Some(window) => {
                let (total, posts) = futures::try_join!(
                    self.db.count_posts(filter),
                    self.db
                        .list_posts(filter, PostOrder::NewestFirst, window.limit, window.offset)
                )?;
                debug!(
                    "Loaded page {} with {} of {} posts",
                    window.number,
                    posts.len(),
                    total
                );
                Ok(self.paginator.page_from_parts(posts, window.number, total))
            }
            None => {
                let total = self.db.count_posts(filter).await?;
                Ok(self
                    .paginator
                    .page_from_parts(Vec::new(), request.resolved(), total))
            }
        }
    }
}
