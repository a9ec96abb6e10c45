// ABOUTME: Profile models for members, trainers, gym admins, and gym records
// ABOUTME: Registration and update schemas with explicit validation
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Profile models
//!
//! Profile collections are keyed by the provider-issued subject id, which is
//! what makes the role invariant checkable: one subject, one collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::check_len;
use crate::errors::AppResult;

/// Stored member profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// Public display name
    pub display_name: String,
    /// Contact email, mirrored from the identity provider
    pub email: String,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Gym the member belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gym_id: Option<String>,
    /// Short biography
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Presence flag, refreshed on authenticated contact
    #[serde(default)]
    pub is_online: bool,
    /// Last authenticated contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
    /// Milestone experience points
    #[serde(default)]
    pub experience_points: i64,
    /// Milestone level, starts at 1
    #[serde(default = "default_level")]
    pub level: i64,
}

const fn default_level() -> i64 {
    1
}

/// Stored trainer profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainerProfile {
    /// Public display name
    pub display_name: String,
    /// Contact email
    pub email: String,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Gym the trainer works at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gym_id: Option<String>,
    /// Training specialties
    #[serde(default)]
    pub specialties: Vec<String>,
    /// Short biography
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Presence flag
    #[serde(default)]
    pub is_online: bool,
    /// Last authenticated contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

/// Stored gym admin profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GymAdminProfile {
    /// Public display name
    pub display_name: String,
    /// Contact email
    pub email: String,
    /// Gym this admin administers; grants elevation scope over its members
    /// and trainers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gym_id: Option<String>,
    /// Presence flag
    #[serde(default)]
    pub is_online: bool,
    /// Last authenticated contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

/// Registration body shared by all three profile kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterProfile {
    /// Public display name
    pub display_name: String,
    /// Contact email
    pub email: String,
    /// Avatar URL
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Gym to attach to
    #[serde(default)]
    pub gym_id: Option<String>,
    /// Short biography
    #[serde(default)]
    pub bio: Option<String>,
    /// Trainer specialties; ignored for non-trainer registrations
    #[serde(default)]
    pub specialties: Vec<String>,
}

impl RegisterProfile {
    /// Validate the registration input shape
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first offending field.
    pub fn validate(&self) -> AppResult<()> {
        check_len("display_name", &self.display_name, 100)?;
        check_len("email", &self.email, 254)?;
        if !self.email.contains('@') {
            return Err(crate::errors::AppError::invalid_input(
                "email is not a valid address",
            ));
        }
        if let Some(bio) = &self.bio {
            check_len("bio", bio, 1000)?;
        }
        if self.specialties.len() > 20 {
            return Err(crate::errors::AppError::invalid_input(
                "at most 20 specialties are allowed",
            ));
        }
        Ok(())
    }

    /// Build the stored member profile
    #[must_use]
    pub fn into_user_profile(self) -> UserProfile {
        UserProfile {
            display_name: self.display_name,
            email: self.email,
            photo_url: self.photo_url,
            gym_id: self.gym_id,
            bio: self.bio,
            is_online: true,
            last_active: Some(Utc::now()),
            experience_points: 0,
            level: 1,
        }
    }

    /// Build the stored trainer profile
    #[must_use]
    pub fn into_trainer_profile(self) -> TrainerProfile {
        TrainerProfile {
            display_name: self.display_name,
            email: self.email,
            photo_url: self.photo_url,
            gym_id: self.gym_id,
            specialties: self.specialties,
            bio: self.bio,
            is_online: true,
            last_active: Some(Utc::now()),
        }
    }

    /// Build the stored gym admin profile
    #[must_use]
    pub fn into_gym_admin_profile(self) -> GymAdminProfile {
        GymAdminProfile {
            display_name: self.display_name,
            email: self.email,
            gym_id: self.gym_id,
            is_online: true,
            last_active: Some(Utc::now()),
        }
    }
}

/// Partial profile update; only supplied fields are overwritten
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// New avatar URL
    #[serde(default)]
    pub photo_url: Option<String>,
    /// New gym attachment
    #[serde(default)]
    pub gym_id: Option<String>,
    /// New biography
    #[serde(default)]
    pub bio: Option<String>,
    /// New specialties (trainers only)
    #[serde(default)]
    pub specialties: Option<Vec<String>>,
}

impl ProfileUpdate {
    /// Validate the supplied fields
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first offending field.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.display_name {
            check_len("display_name", name, 100)?;
        }
        if let Some(bio) = &self.bio {
            check_len("bio", bio, 1000)?;
        }
        Ok(())
    }

    /// Convert into patch fields, skipping unset entries
    #[must_use]
    pub fn into_patch_fields(self) -> serde_json::Map<String, Value> {
        let mut fields = serde_json::Map::new();
        if let Some(v) = self.display_name {
            fields.insert("display_name".to_owned(), Value::String(v));
        }
        if let Some(v) = self.photo_url {
            fields.insert("photo_url".to_owned(), Value::String(v));
        }
        if let Some(v) = self.gym_id {
            fields.insert("gym_id".to_owned(), Value::String(v));
        }
        if let Some(v) = self.bio {
            fields.insert("bio".to_owned(), Value::String(v));
        }
        if let Some(v) = self.specialties {
            fields.insert(
                "specialties".to_owned(),
                Value::Array(v.into_iter().map(Value::String).collect()),
            );
        }
        fields
    }
}

/// Stored gym record, owned by the gym admin who created it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gym {
    /// Gym name
    pub name: String,
    /// Street address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Description shown on the gym page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cover photo URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Gym creation body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GymCreate {
    /// Gym name
    pub name: String,
    /// Street address
    #[serde(default)]
    pub address: Option<String>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Cover photo URL
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl GymCreate {
    /// Validate the creation input shape
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first offending field.
    pub fn validate(&self) -> AppResult<()> {
        check_len("name", &self.name, 200)?;
        if let Some(description) = &self.description {
            check_len("description", description, 2000)?;
        }
        Ok(())
    }

    /// Build the stored gym record
    #[must_use]
    pub fn into_gym(self) -> Gym {
        Gym {
            name: self.name,
            address: self.address,
            description: self.description,
            photo_url: self.photo_url,
        }
    }
}

/// Partial gym update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GymUpdate {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New address
    #[serde(default)]
    pub address: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// New cover photo URL
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl GymUpdate {
    /// Validate the supplied fields
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first offending field.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            check_len("name", name, 200)?;
        }
        if let Some(description) = &self.description {
            check_len("description", description, 2000)?;
        }
        Ok(())
    }

    /// Convert into patch fields, skipping unset entries
    #[must_use]
    pub fn into_patch_fields(self) -> serde_json::Map<String, Value> {
        let mut fields = serde_json::Map::new();
        if let Some(v) = self.name {
            fields.insert("name".to_owned(), Value::String(v));
        }
        if let Some(v) = self.address {
            fields.insert("address".to_owned(), Value::String(v));
        }
        if let Some(v) = self.description {
            fields.insert("description".to_owned(), Value::String(v));
        }
        if let Some(v) = self.photo_url {
            fields.insert("photo_url".to_owned(), Value::String(v));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegisterProfile {
        RegisterProfile {
            display_name: "Dana Lifts".to_owned(),
            email: "dana@example.com".to_owned(),
            photo_url: None,
            gym_id: Some("gym-1".to_owned()),
            bio: None,
            specialties: vec![],
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn empty_display_name_is_rejected() {
        let mut reg = registration();
        reg.display_name = "   ".to_owned();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut reg = registration();
        reg.email = "not-an-address".to_owned();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn update_patch_skips_unset_fields() {
        let update = ProfileUpdate {
            bio: Some("new bio".to_owned()),
            ..ProfileUpdate::default()
        };
        let fields = update.into_patch_fields();
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("bio"));
    }
}
