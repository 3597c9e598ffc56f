//! User profile documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProfileError, UserId};

/// Maximum username length in characters.
pub const MAX_USERNAME_LEN: usize = 32;

/// Public metadata of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The owning user.
    pub user_id: UserId,

    /// Display name, unique across profiles.
    pub username: String,

    /// Email address as known to the identity provider.
    pub email: String,

    /// Reference to the avatar image in external blob storage.
    pub avatar_url: Option<String>,

    /// When the profile was created.
    pub created_at: DateTime<Utc>,

    /// When the profile was last updated.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Build a profile from validated creation input.
    #[must_use]
    pub fn new(user_id: UserId, input: NewProfile, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            username: input.username,
            email: input.email,
            avatar_url: input.avatar_url,
            created_at: now,
            updated_at: None,
        }
    }

    /// Apply a validated partial update.
    ///
    /// Returns the previous username if it changed.
    pub fn apply(&mut self, update: ProfileUpdate, now: DateTime<Utc>) -> Option<String> {
        let mut previous = None;
        if let Some(username) = update.username {
            if username != self.username {
                previous = Some(std::mem::replace(&mut self.username, username));
            }
        }
        if let Some(avatar_url) = update.avatar_url {
            self.avatar_url = if avatar_url.is_empty() {
                None
            } else {
                Some(avatar_url)
            };
        }
        self.updated_at = Some(now);
        previous
    }
}

/// Input for creating a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    /// Requested username.
    pub username: String,

    /// Email address.
    pub email: String,

    /// Optional avatar reference.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl NewProfile {
    /// Trim and validate the input.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidProfile` if the username is empty or
    /// too long after trimming.
    pub fn normalized(self) -> Result<Self, ProfileError> {
        Ok(Self {
            username: normalize_username(&self.username)?,
            email: self.email.trim().to_string(),
            avatar_url: self
                .avatar_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        })
    }
}

/// Partial profile update. `None` fields are left untouched.
///
/// An `avatar_url` that is empty after trimming clears the avatar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New username.
    #[serde(default)]
    pub username: Option<String>,

    /// New avatar reference.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Trim and validate the update.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidProfile` if a new username is empty or
    /// too long after trimming.
    pub fn normalized(self) -> Result<Self, ProfileError> {
        Ok(Self {
            username: self
                .username
                .as_deref()
                .map(normalize_username)
                .transpose()?,
            avatar_url: self.avatar_url.map(|url| url.trim().to_string()),
        })
    }
}

fn normalize_username(raw: &str) -> Result<String, ProfileError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(ProfileError::InvalidProfile(
            "username must not be empty".into(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ProfileError::InvalidProfile(format!(
            "username longer than {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(username.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_profile(username: &str) -> NewProfile {
        NewProfile {
            username: username.into(),
            email: " romain@example.com ".into(),
            avatar_url: Some("   ".into()),
        }
    }

    #[test]
    fn new_profile_is_trimmed() {
        let input = new_profile("  romain ").normalized().unwrap();
        assert_eq!(input.username, "romain");
        assert_eq!(input.email, "romain@example.com");
        assert_eq!(input.avatar_url, None);
    }

    #[test]
    fn blank_username_rejected() {
        assert!(matches!(
            new_profile("   ").normalized(),
            Err(ProfileError::InvalidProfile(_))
        ));
        let update = ProfileUpdate {
            username: Some(String::new()),
            avatar_url: None,
        };
        assert!(update.normalized().is_err());
    }

    #[test]
    fn long_username_rejected() {
        let long = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(new_profile(&long).normalized().is_err());
    }

    #[test]
    fn apply_reports_previous_username() {
        let now = Utc::now();
        let mut profile = Profile::new(
            UserId::generate(),
            new_profile("old").normalized().unwrap(),
            now,
        );

        let previous = profile.apply(
            ProfileUpdate {
                username: Some("new".into()),
                avatar_url: Some("avatars/new.png".into()),
            },
            now,
        );

        assert_eq!(previous.as_deref(), Some("old"));
        assert_eq!(profile.username, "new");
        assert_eq!(profile.avatar_url.as_deref(), Some("avatars/new.png"));
        assert_eq!(profile.updated_at, Some(now));
    }

    #[test]
    fn empty_avatar_clears_reference() {
        let now = Utc::now();
        let mut profile = Profile::new(
            UserId::generate(),
            new_profile("romain").normalized().unwrap(),
            now,
        );
        profile.avatar_url = Some("avatars/a.png".into());

        let update = ProfileUpdate {
            username: Some("romain".into()),
            avatar_url: Some("  ".into()),
        }
        .normalized()
        .unwrap();
        let previous = profile.apply(update, now);

        assert!(previous.is_none());
        assert!(profile.avatar_url.is_none());
    }
}
