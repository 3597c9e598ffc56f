//! Profile handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use flg_core::{Profile, ProfileUpdate};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// Profile response.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// User ID.
    pub user_id: String,
    /// Username.
    pub username: String,
    /// Email.
    pub email: String,
    /// Avatar reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Created timestamp.
    pub created_at: String,
    /// Last update timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<&Profile> for ProfileResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.user_id.to_string(),
            username: profile.username.clone(),
            email: profile.email.clone(),
            avatar_url: profile.avatar_url.clone(),
            created_at: profile.created_at.to_rfc3339(),
            updated_at: profile.updated_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// `GET /v1/profile`
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .profiles
        .get_profile(&caller.identity)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

    Ok(Json(ProfileResponse::from(&profile)))
}

/// `PATCH /v1/profile`: change the username and/or avatar.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .profiles
        .update_profile(&caller.identity, update)
        .await?;

    Ok(Json(ProfileResponse::from(&profile)))
}
