// ABOUTME: Notification models delivered to a single recipient
// ABOUTME: Kind enum covers connection, chat, and milestone events
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Notification models

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// What event produced a notification
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone sent the recipient a connection request
    ConnectionRequest,
    /// A connection request the recipient sent was accepted
    ConnectionAccepted,
    /// A new chat message arrived
    NewMessage,
    /// The recipient advanced a milestone level
    LevelUp,
    /// The recipient unlocked an achievement
    AchievementUnlocked,
    /// The recipient was invited to a challenge
    ChallengeInvite,
}

impl NotificationKind {
    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionRequest => "connection_request",
            Self::ConnectionAccepted => "connection_accepted",
            Self::NewMessage => "new_message",
            Self::LevelUp => "level_up",
            Self::AchievementUnlocked => "achievement_unlocked",
            Self::ChallengeInvite => "challenge_invite",
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "connection_request" => Ok(Self::ConnectionRequest),
            "connection_accepted" => Ok(Self::ConnectionAccepted),
            "new_message" => Ok(Self::NewMessage),
            "level_up" => Ok(Self::LevelUp),
            "achievement_unlocked" => Ok(Self::AchievementUnlocked),
            "challenge_invite" => Ok(Self::ChallengeInvite),
            _ => Err(AppError::invalid_input(format!(
                "Invalid notification kind: {s}"
            ))),
        }
    }
}

/// Stored notification; the owner column holds the recipient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Event kind
    pub kind: NotificationKind,
    /// Id of the record the event refers to (connection, message, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    /// Human-readable notification text
    pub text: String,
    /// Whether the recipient has seen it
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    /// Create an unread notification
    #[must_use]
    pub fn new(kind: NotificationKind, reference_id: Option<String>, text: String) -> Self {
        Self {
            kind,
            reference_id,
            text,
            read: false,
        }
    }
}
