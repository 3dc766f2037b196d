use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::core::{GroupId, PostId, UserId};
use crate::models::{GroupRef, UserRef};

/// Characters of the text used as the display name of a post
pub const POST_DISPLAY_LENGTH: usize = 15;

/// A published post. `pub_date` is set once by the server at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: UserRef,
    pub group: Option<GroupRef>,
    pub image: Option<PostImage>,
}

/// Binary attachment stored alongside a post
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostImage {
    pub file_name: String,
    pub content_type: String,
    #[serde(serialize_with = "encode_base64", skip_deserializing)]
    pub data: Vec<u8>,
}

impl fmt::Debug for PostImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostImage")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

fn encode_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: UserId,
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<PostImage>,
    pub pub_date: DateTime<Utc>,
}

/// Fields an author may change. Author and `pub_date` are not part of it.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group: Option<GroupId>,
    /// `None` keeps the current attachment
    pub image: Option<PostImage>,
}

impl Post {
    /// First `length` characters of the text, counted by character
    pub fn truncated_text(&self, length: usize) -> String {
        self.text.chars().take(length).collect()
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.truncated_text(POST_DISPLAY_LENGTH))
    }
}
