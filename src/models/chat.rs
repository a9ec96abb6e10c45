// ABOUTME: Chat models for direct conversations and messages
// ABOUTME: Participant-scoped access; only participants may read or post
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Chat models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::check_len;
use crate::errors::{AppError, AppResult};

/// Stored conversation between two participants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    /// Both participant subject ids
    pub participant_ids: Vec<String>,
    /// Preview of the most recent message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    /// When the most recent message arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Create a conversation between two subjects
    #[must_use]
    pub fn new(a: String, b: String) -> Self {
        Self {
            participant_ids: vec![a, b],
            last_message: None,
            last_message_at: None,
        }
    }

    /// Whether the subject participates in the conversation
    #[must_use]
    pub fn involves(&self, subject_id: &str) -> bool {
        self.participant_ids.iter().any(|id| id == subject_id)
    }

    /// The other participant from the given subject's perspective
    #[must_use]
    pub fn other_participant(&self, subject_id: &str) -> Option<&str> {
        self.participant_ids
            .iter()
            .map(String::as_str)
            .find(|id| *id != subject_id)
    }
}

/// Conversation creation body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationCreate {
    /// Subject to open a conversation with
    pub participant_id: String,
}

impl ConversationCreate {
    /// Validate the input shape
    ///
    /// # Errors
    ///
    /// Returns a validation error when the participant id is empty.
    pub fn validate(&self) -> AppResult<()> {
        if self.participant_id.trim().is_empty() {
            return Err(AppError::new(
                crate::errors::ErrorCode::MissingRequiredField,
                "participant_id must not be empty",
            ));
        }
        Ok(())
    }
}

/// Stored chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Conversation the message belongs to
    pub conversation_id: String,
    /// Author subject id
    pub sender_id: String,
    /// Message body
    pub content: String,
    /// Whether the recipient has read the message
    #[serde(default)]
    pub read: bool,
}

/// Message creation body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreate {
    /// Message body
    pub content: String,
}

impl MessageCreate {
    /// Validate the input shape
    ///
    /// # Errors
    ///
    /// Returns a validation error when the body is empty or too long.
    pub fn validate(&self) -> AppResult<()> {
        check_len("content", &self.content, 4000)
    }
}
