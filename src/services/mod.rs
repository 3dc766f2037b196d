// Services - feed queries, post mutations and administration over the store

pub mod admin_service;
pub mod feed_service;
pub mod post_service;

pub use admin_service::{AdminService, FormOutcome};
pub use feed_service::{
    FeedService, FeedView, GroupFeedView, PostDetailView, ProfileView, FOLLOWING_FEED_TITLE,
    GLOBAL_FEED_TITLE,
};
pub use post_service::{
    CommentOutcome, CreatePostOutcome, EditFormOutcome, EditPostOutcome, FollowOutcome,
    PostFormView, PostService, UnfollowOutcome,
};
