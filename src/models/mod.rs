// Domain records - users, groups, posts and comments

pub mod comment;
pub mod group;
pub mod post;
pub mod user;

pub use comment::{Comment, NewComment};
pub use group::{Group, GroupRef, NewGroup};
pub use post::{NewPost, Post, PostChanges, PostImage, POST_DISPLAY_LENGTH};
pub use user::{User, UserRef};
