// ABOUTME: Milestone models for experience points, levels, achievements, challenges
// ABOUTME: Level progression follows points_for_next_level = 100 * level^1.5
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Milestone models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::check_len;
use crate::errors::{AppError, AppResult};

/// Points needed to advance past the given level
#[must_use]
pub fn points_for_next_level(level: i64) -> i64 {
    let level = level.max(1) as f64;
    (100.0 * level.powf(1.5)) as i64
}

/// Snapshot of a member's milestone progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneSummary {
    /// Current level
    pub level: i64,
    /// Accumulated experience points
    pub total_points: i64,
    /// Points needed to reach the next level
    pub points_for_next_level: i64,
    /// Progress toward the next level in `[0, 1]`
    pub progress: f64,
}

impl MilestoneSummary {
    /// Build a summary from stored level and points
    #[must_use]
    pub fn from_points(level: i64, total_points: i64) -> Self {
        let needed = points_for_next_level(level);
        let progress = if needed > 0 {
            (total_points as f64 / needed as f64).min(1.0)
        } else {
            0.0
        };
        Self {
            level,
            total_points,
            points_for_next_level: needed,
            progress,
        }
    }
}

/// Catalog achievement definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Achievement {
    /// Achievement name
    pub name: String,
    /// What the member did to earn it
    pub description: String,
    /// Icon URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Points awarded on unlock
    #[serde(default)]
    pub points: i64,
}

/// A member's unlocked achievement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAchievement {
    /// Catalog achievement id
    pub achievement_id: String,
    /// Whether it has been unlocked
    #[serde(default)]
    pub is_unlocked: bool,
    /// When it was unlocked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Stored challenge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Challenge {
    /// Challenge title
    pub title: String,
    /// Description of the goal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Gym scope, when restricted to one gym
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gym_id: Option<String>,
    /// When the challenge starts
    pub starts_at: DateTime<Utc>,
    /// When the challenge ends
    pub ends_at: DateTime<Utc>,
    /// Points required to complete the challenge
    pub goal_points: i64,
}

/// Challenge creation body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeCreate {
    /// Challenge title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Gym scope
    #[serde(default)]
    pub gym_id: Option<String>,
    /// Start time
    pub starts_at: DateTime<Utc>,
    /// End time
    pub ends_at: DateTime<Utc>,
    /// Points required to complete
    pub goal_points: i64,
}

impl ChallengeCreate {
    /// Validate the input shape
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty title, a non-positive goal,
    /// or an end time before the start time.
    pub fn validate(&self) -> AppResult<()> {
        check_len("title", &self.title, 200)?;
        if self.goal_points <= 0 {
            return Err(AppError::invalid_input("goal_points must be positive"));
        }
        if self.ends_at <= self.starts_at {
            return Err(AppError::invalid_input("ends_at must be after starts_at"));
        }
        Ok(())
    }

    /// Build the stored challenge
    #[must_use]
    pub fn into_challenge(self) -> Challenge {
        Challenge {
            title: self.title,
            description: self.description,
            gym_id: self.gym_id,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            goal_points: self.goal_points,
        }
    }
}

/// Point-earning activity reported by a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityReport {
    /// What kind of activity was performed
    pub activity_type: String,
    /// Points claimed for it
    pub points: i64,
}

impl ActivityReport {
    /// Per-report point ceiling; keeps self-reported grinding in check
    pub const MAX_POINTS: i64 = 1000;

    /// Validate the input shape
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty activity type or an
    /// out-of-range point claim.
    pub fn validate(&self) -> AppResult<()> {
        check_len("activity_type", &self.activity_type, 100)?;
        if self.points <= 0 || self.points > Self::MAX_POINTS {
            return Err(AppError::invalid_input(format!(
                "points must be between 1 and {}",
                Self::MAX_POINTS
            )));
        }
        Ok(())
    }
}
