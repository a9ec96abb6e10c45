// ABOUTME: Typed domain models and request schemas for all entity collections
// ABOUTME: Explicit structs with validation functions, decoupled from serialization
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Domain Models
//!
//! One module per entity family. Request schemas validate with an explicit
//! `validate()` returning a typed result; stored shapes serialize to the JSON
//! payload of a store [`Record`](crate::store::Record).

pub mod chat;
pub mod connection;
pub mod milestone;
pub mod notification;
pub mod social;
pub mod user;

pub use chat::{Conversation, ConversationCreate, Message, MessageCreate};
pub use connection::{Connection, ConnectionRequest, ConnectionStatus};
pub use milestone::{
    Achievement, ActivityReport, Challenge, ChallengeCreate, MilestoneSummary, UserAchievement,
};
pub use notification::{Notification, NotificationKind};
pub use social::{Comment, CommentCreate, Post, PostCreate, PostPrivacy, PostType, PostUpdate};
pub use user::{
    Gym, GymAdminProfile, GymCreate, GymUpdate, ProfileUpdate, RegisterProfile, TrainerProfile,
    UserProfile,
};

use crate::errors::{AppError, AppResult};

/// Shared length guard for free-text fields
pub(crate) fn check_len(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::new(
            crate::errors::ErrorCode::MissingRequiredField,
            format!("{field} must not be empty"),
        ));
    }
    if value.chars().count() > max {
        return Err(AppError::invalid_input(format!(
            "{field} exceeds the maximum length of {max} characters"
        )));
    }
    Ok(())
}

/// Serialize a model into a store payload
pub(crate) fn to_payload<T: serde::Serialize>(model: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(model)
        .map_err(|e| AppError::internal(format!("failed to serialize payload: {e}")))
}
