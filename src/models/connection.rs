// ABOUTME: Connection models for member-to-member relationship requests
// ABOUTME: Status lifecycle pending -> accepted/declined, with blocking
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Connection models

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Status of a connection request
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Request sent, awaiting acceptance
    #[default]
    Pending,
    /// Both members are connected
    Accepted,
    /// Request was declined by the recipient
    Declined,
    /// One member blocked the other
    Blocked,
}

impl ConnectionStatus {
    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Blocked => "blocked",
        }
    }

    /// Whether this status represents an active connection
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "blocked" => Ok(Self::Blocked),
            _ => Err(AppError::invalid_input(format!(
                "Invalid connection status: {s}"
            ))),
        }
    }
}

/// Stored connection between two members
///
/// `user_ids` always holds both participants so membership queries can use a
/// single array-contains filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    /// Both participant subject ids
    pub user_ids: Vec<String>,
    /// Who sent the request
    pub requester_id: String,
    /// Who received it
    pub recipient_id: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: ConnectionStatus,
    /// Optional message attached to the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Connection {
    /// Create a fresh pending connection
    #[must_use]
    pub fn new(requester_id: String, recipient_id: String, message: Option<String>) -> Self {
        Self {
            user_ids: vec![requester_id.clone(), recipient_id.clone()],
            requester_id,
            recipient_id,
            status: ConnectionStatus::Pending,
            message,
        }
    }

    /// The other participant from the given subject's perspective
    #[must_use]
    pub fn other_participant(&self, subject_id: &str) -> Option<&str> {
        self.user_ids
            .iter()
            .map(String::as_str)
            .find(|id| *id != subject_id)
    }

    /// Whether the given subject participates in this connection
    #[must_use]
    pub fn involves(&self, subject_id: &str) -> bool {
        self.user_ids.iter().any(|id| id == subject_id)
    }
}

/// Connection request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Subject id to connect with
    pub recipient_id: String,
    /// Optional message shown to the recipient
    #[serde(default)]
    pub message: Option<String>,
}

impl ConnectionRequest {
    /// Validate the input shape
    ///
    /// # Errors
    ///
    /// Returns a validation error when the recipient is missing or the
    /// message is too long.
    pub fn validate(&self) -> AppResult<()> {
        if self.recipient_id.trim().is_empty() {
            return Err(AppError::new(
                crate::errors::ErrorCode::MissingRequiredField,
                "recipient_id must not be empty",
            ));
        }
        if let Some(message) = &self.message {
            super::check_len("message", message, 500)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_participant_is_symmetric() {
        let conn = Connection::new("alice".to_owned(), "bob".to_owned(), None);
        assert_eq!(conn.other_participant("alice"), Some("bob"));
        assert_eq!(conn.other_participant("bob"), Some("alice"));
        assert_eq!(conn.other_participant("carol"), Some("alice"));
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            ConnectionStatus::Pending,
            ConnectionStatus::Accepted,
            ConnectionStatus::Declined,
            ConnectionStatus::Blocked,
        ] {
            assert_eq!(
                ConnectionStatus::from_str(status.as_str()).unwrap(),
                status
            );
        }
    }
}
