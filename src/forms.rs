// Forms - submitted payloads and their field-level validation
// Validation failures are values (`FormErrors`), not `AppError`s.

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::GroupId;
use crate::models::{NewGroup, Post, PostImage};

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const GROUP_TITLE_MAX_LENGTH: usize = 200;

static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-\w]+$").expect("hardcoded slug regex is invalid"));

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("hardcoded username regex is invalid"));

const REQUIRED: &str = "This field is required.";

/// Field name to messages, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

/// Image attachment as submitted, with base64 content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUpload {
    pub file_name: String,
    #[serde(default)]
    pub content_type: String,
    pub data: String,
}

impl ImageUpload {
    fn decode(&self) -> Result<PostImage, String> {
        if self.file_name.trim().is_empty() {
            return Err("The submitted file is empty.".to_string());
        }
        let data = base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|_| "Upload a valid image.".to_string())?;
        if data.is_empty() {
            return Err("The submitted file is empty.".to_string());
        }
        Ok(PostImage {
            file_name: self.file_name.trim().to_string(),
            content_type: if self.content_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                self.content_type.clone()
            },
            data,
        })
    }
}

/// Create/edit post form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: Option<GroupId>,
    #[serde(default, skip_serializing)]
    pub image: Option<ImageUpload>,
}

/// A post form that passed the checks that need no store lookup
#[derive(Debug, Clone)]
pub struct CleanPost {
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<PostImage>,
}

impl PostForm {
    /// Form pre-filled from an existing post
    pub fn from_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group.as_ref().map(|g| g.id),
            image: None,
        }
    }

    pub fn clean(&self) -> Result<CleanPost, FormErrors> {
        let mut errors = FormErrors::new();

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let image = match &self.image {
            Some(upload) => match upload.decode() {
                Ok(image) => Some(image),
                Err(message) => {
                    errors.add("image", message);
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(CleanPost {
            text: text.to_string(),
            group: self.group,
            image,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let text = self.text.trim();
        if text.is_empty() {
            let mut errors = FormErrors::new();
            errors.add("text", REQUIRED);
            return Err(errors);
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

impl GroupForm {
    pub fn clean(&self) -> Result<NewGroup, FormErrors> {
        let mut errors = FormErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", REQUIRED);
        } else if title.chars().count() > GROUP_TITLE_MAX_LENGTH {
            errors.add(
                "title",
                format!(
                    "Ensure this value has at most {} characters.",
                    GROUP_TITLE_MAX_LENGTH
                ),
            );
        }

        let slug = self.slug.trim();
        if slug.is_empty() {
            errors.add("slug", REQUIRED);
        } else if !is_valid_slug(slug) {
            errors.add(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewGroup {
            title: title.to_string(),
            slug: slug.to_string(),
            description: self.description.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
}

impl SignupForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let username = self.username.trim();
        let mut errors = FormErrors::new();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if username.chars().count() > USERNAME_MAX_LENGTH {
            errors.add(
                "username",
                format!(
                    "Ensure this value has at most {} characters.",
                    USERNAME_MAX_LENGTH
                ),
            );
        } else if !is_valid_username(username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(username.to_string())
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_post_text_is_required() {
        let form = PostForm {
            text: "   \n".to_string(),
            ..PostForm::default()
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(errors.field("text"), [REQUIRED.to_string()]);
    }

    #[test]
    fn test_post_text_is_trimmed() {
        let form = PostForm {
            text: "  spaced  ".to_string(),
            group: Some(GroupId::new(3)),
            image: None,
        };
        let clean = form.clean().unwrap();
        assert_eq!(clean.text, "spaced");
        assert_eq!(clean.group, Some(GroupId::new(3)));
    }

    #[test]
    fn test_image_is_decoded() {
        let form = PostForm {
            text: "with image".to_string(),
            group: None,
            image: Some(ImageUpload {
                file_name: "small.gif".to_string(),
                content_type: "image/gif".to_string(),
                data: "R0lGODlh".to_string(),
            }),
        };
        let image = form.clean().unwrap().image.unwrap();
        assert_eq!(image.data, b"GIF89a");
    }

    #[test]
    fn test_invalid_base64_is_a_field_error() {
        let form = PostForm {
            text: "ok".to_string(),
            group: None,
            image: Some(ImageUpload {
                file_name: "x.png".to_string(),
                content_type: String::new(),
                data: "not base64!!".to_string(),
            }),
        };
        let errors = form.clean().unwrap_err();
        assert!(errors.has("image"));
        assert!(!errors.has("text"));
    }

    #[test]
    fn test_empty_comment_is_invalid() {
        assert!(CommentForm { text: " ".into() }.clean().is_err());
        assert_eq!(
            CommentForm { text: " hi \n".into() }.clean().unwrap(),
            "hi".to_string()
        );
    }

    #[test]
    fn test_slug_and_username_patterns() {
        assert!(is_valid_slug("test-group_1"));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug("a/b"));

        assert!(is_valid_username("leo.tolstoy@example+1"));
        assert!(!is_valid_username("no spaces"));
    }

    #[test]
    fn test_group_form_reports_every_field() {
        let errors = GroupForm {
            title: String::new(),
            slug: "bad slug".into(),
            description: String::new(),
        }
        .clean()
        .unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("slug"));
    }

    #[test]
    fn test_signup_rejects_long_usernames() {
        let form = SignupForm {
            username: "a".repeat(USERNAME_MAX_LENGTH + 1),
        };
        assert!(form.clean().unwrap_err().has("username"));
    }
}
