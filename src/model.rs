use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_ID_LEN: usize = 128;

/// A user profile as exposed over HTTP.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub age: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<bool>,
    #[serde(default)]
    pub users_visibility: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Reveals this user to `others`. Ids already present and the user's own
    /// id are skipped.
    pub fn reveal_to(&mut self, others: &[String]) {
        for other in others {
            if *other != self.id && !self.users_visibility.contains(other) {
                self.users_visibility.push(other.clone());
            }
        }
    }

    /// Hides this user from `others`. Ids not in the list are ignored.
    pub fn hide_from(&mut self, others: &[String]) {
        self.users_visibility.retain(|id| !others.contains(id));
    }

    /// Drops repeated ids and the user's own id from `users_visibility`,
    /// keeping the first occurrence of each.
    pub fn dedup_visibility(&mut self) {
        let mut seen = HashSet::new();
        let own_id = &self.id;
        self.users_visibility
            .retain(|id| id != own_id && seen.insert(id.clone()));
    }

    /// Flips the anonymous flag and returns the new value. An unset flag
    /// counts as `false`.
    pub fn toggle_anonymous(&mut self) -> bool {
        let anonymous = !self.anonymous.unwrap_or(false);
        self.anonymous = Some(anonymous);
        anonymous
    }
}

/// Body of a creation request.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub age: i32,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        if self.age <= 0 {
            return Err(ValidationError::NonPositiveAge(self.age));
        }
        validate_interests(&self.interests)
    }

    pub fn into_user(self, id: String, created_at: DateTime<Utc>) -> User {
        User {
            id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            interests: self.interests,
            anonymous: None,
            users_visibility: Vec::new(),
            created_at: Some(created_at),
        }
    }
}

/// Body of `/visible` and `/invisible`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    pub other_users: Vec<String>,
}

/// Body of an interests replacement.
#[derive(Deserialize, Debug, Clone)]
pub struct InterestsRequest {
    pub interests: Vec<String>,
}

/// Fields a store update may overwrite. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub interests: Option<Vec<String>>,
    pub users_visibility: Option<Vec<String>>,
    pub anonymous: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.interests.is_none() && self.users_visibility.is_none() && self.anonymous.is_none()
    }

    pub fn apply(self, user: &mut User) {
        if let Some(interests) = self.interests {
            user.interests = interests;
        }
        if let Some(users_visibility) = self.users_visibility {
            user.users_visibility = users_visibility;
        }
        if let Some(anonymous) = self.anonymous {
            user.anonymous = Some(anonymous);
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    BlankName,

    #[error("Age must be greater than 0, got {0}")]
    NonPositiveAge(i32),

    #[error("Interests cannot be empty")]
    NoInterests,

    #[error("Interests cannot contain blank entries")]
    BlankInterest,

    #[error("Malformed user id: '{0}'")]
    MalformedId(String),
}

pub fn validate_interests(interests: &[String]) -> Result<(), ValidationError> {
    if interests.is_empty() {
        return Err(ValidationError::NoInterests);
    }
    if interests.iter().any(|interest| interest.trim().is_empty()) {
        return Err(ValidationError::BlankInterest);
    }
    Ok(())
}

/// Checks that `id` can be a document key.
pub fn parse_id(id: &str) -> Result<&str, ValidationError> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if well_formed {
        Ok(id)
    } else {
        Err(ValidationError::MalformedId(id.to_string()))
    }
}
