// ABOUTME: Social feed models for posts, comments, and likes
// ABOUTME: Privacy and post-type enums with stored and request schemas
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Social feed models

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::check_len;
use crate::errors::{AppError, AppResult};

/// Who can see a post
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostPrivacy {
    /// Visible to everyone on the platform
    #[default]
    Public,
    /// Visible to accepted connections only
    Friends,
    /// Visible to accounts attached to the same gym
    Gym,
    /// Visible to the author only
    Private,
}

impl PostPrivacy {
    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Friends => "friends",
            Self::Gym => "gym",
            Self::Private => "private",
        }
    }
}

impl Display for PostPrivacy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PostPrivacy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "friends" => Ok(Self::Friends),
            "gym" => Ok(Self::Gym),
            "private" => Ok(Self::Private),
            _ => Err(AppError::invalid_input(format!(
                "Invalid post privacy: {s}"
            ))),
        }
    }
}

/// What kind of content a post carries
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    /// Plain status update
    #[default]
    Update,
    /// Gym or community event
    Event,
    /// Poll with options
    Poll,
    /// Unlocked achievement announcement
    Achievement,
    /// Workout summary
    Workout,
}

impl PostType {
    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Event => "event",
            Self::Poll => "poll",
            Self::Achievement => "achievement",
            Self::Workout => "workout",
        }
    }
}

impl Display for PostType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PostType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "update" => Ok(Self::Update),
            "event" => Ok(Self::Event),
            "poll" => Ok(Self::Poll),
            "achievement" => Ok(Self::Achievement),
            "workout" => Ok(Self::Workout),
            _ => Err(AppError::invalid_input(format!("Invalid post type: {s}"))),
        }
    }
}

/// Stored post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Post body text
    pub content: String,
    /// Visibility
    #[serde(default)]
    pub privacy: PostPrivacy,
    /// Content kind
    #[serde(default)]
    pub post_type: PostType,
    /// Attached media URLs
    #[serde(default)]
    pub media: Vec<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional location string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Gym the post is scoped to, required for gym-visibility posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gym_id: Option<String>,
    /// Type-specific extra data (event/poll/workout/achievement details)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Value>,
    /// Denormalized like counter
    #[serde(default)]
    pub like_count: i64,
    /// Denormalized comment counter
    #[serde(default)]
    pub comment_count: i64,
}

/// Post creation body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCreate {
    /// Post body text
    pub content: String,
    /// Visibility
    #[serde(default)]
    pub privacy: PostPrivacy,
    /// Content kind
    #[serde(default)]
    pub post_type: PostType,
    /// Attached media URLs
    #[serde(default)]
    pub media: Vec<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional location string
    #[serde(default)]
    pub location: Option<String>,
    /// Gym scope, required for gym-visibility posts
    #[serde(default)]
    pub gym_id: Option<String>,
    /// Type-specific extra data
    #[serde(default)]
    pub extra_data: Option<Value>,
}

impl PostCreate {
    /// Validate the creation input shape
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first offending field.
    pub fn validate(&self) -> AppResult<()> {
        check_len("content", &self.content, 5000)?;
        if self.media.len() > 10 {
            return Err(AppError::invalid_input("at most 10 media items per post"));
        }
        if self.tags.len() > 20 {
            return Err(AppError::invalid_input("at most 20 tags per post"));
        }
        if self.privacy == PostPrivacy::Gym && self.gym_id.is_none() {
            return Err(AppError::new(
                crate::errors::ErrorCode::MissingRequiredField,
                "gym_id is required for gym-visibility posts",
            ));
        }
        Ok(())
    }

    /// Build the stored post
    #[must_use]
    pub fn into_post(self) -> Post {
        Post {
            content: self.content,
            privacy: self.privacy,
            post_type: self.post_type,
            media: self.media,
            tags: self.tags,
            location: self.location,
            gym_id: self.gym_id,
            extra_data: self.extra_data,
            like_count: 0,
            comment_count: 0,
        }
    }
}

/// Partial post update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostUpdate {
    /// New body text
    #[serde(default)]
    pub content: Option<String>,
    /// New visibility
    #[serde(default)]
    pub privacy: Option<PostPrivacy>,
    /// Replacement media list
    #[serde(default)]
    pub media: Option<Vec<String>>,
    /// Replacement tag list
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// New location
    #[serde(default)]
    pub location: Option<String>,
}

impl PostUpdate {
    /// Validate the supplied fields
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first offending field.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(content) = &self.content {
            check_len("content", content, 5000)?;
        }
        if let Some(media) = &self.media {
            if media.len() > 10 {
                return Err(AppError::invalid_input("at most 10 media items per post"));
            }
        }
        Ok(())
    }

    /// Convert into patch fields, skipping unset entries
    #[must_use]
    pub fn into_patch_fields(self) -> serde_json::Map<String, Value> {
        let mut fields = serde_json::Map::new();
        if let Some(v) = self.content {
            fields.insert("content".to_owned(), Value::String(v));
        }
        if let Some(v) = self.privacy {
            fields.insert("privacy".to_owned(), Value::String(v.as_str().to_owned()));
        }
        if let Some(v) = self.media {
            fields.insert(
                "media".to_owned(),
                Value::Array(v.into_iter().map(Value::String).collect()),
            );
        }
        if let Some(v) = self.tags {
            fields.insert(
                "tags".to_owned(),
                Value::Array(v.into_iter().map(Value::String).collect()),
            );
        }
        if let Some(v) = self.location {
            fields.insert("location".to_owned(), Value::String(v));
        }
        fields
    }
}

/// Stored comment on a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    /// Post the comment belongs to
    pub post_id: String,
    /// Comment body
    pub content: String,
}

/// Comment creation body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreate {
    /// Comment body
    pub content: String,
}

impl CommentCreate {
    /// Validate the input shape
    ///
    /// # Errors
    ///
    /// Returns a validation error when the body is empty or too long.
    pub fn validate(&self) -> AppResult<()> {
        check_len("content", &self.content, 2000)
    }
}
