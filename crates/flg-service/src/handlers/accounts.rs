//! Account opening.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use flg_core::NewProfile;
use flg_ledger::OpenedAccount;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::handlers::profile::ProfileResponse;
use crate::state::AppState;

/// Open account request.
#[derive(Debug, Deserialize)]
pub struct OpenAccountRequest {
    /// Desired username, unique across users.
    pub username: String,
    /// Email as known to the identity provider.
    pub email: String,
    /// Optional avatar reference.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Open account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// The created profile.
    pub profile: ProfileResponse,
    /// Starting balance in credits.
    pub balance: i64,
}

impl From<OpenedAccount> for AccountResponse {
    fn from(opened: OpenedAccount) -> Self {
        Self {
            profile: ProfileResponse::from(&opened.profile),
            balance: opened.account.balance,
        }
    }
}

/// `POST /v1/accounts`: create the caller's profile and balance together.
pub async fn open_account(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<OpenAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let input = NewProfile {
        username: body.username,
        email: body.email,
        avatar_url: body.avatar_url,
    };

    let opened = state.profiles.open_account(&caller.identity, input).await?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(opened))))
}
