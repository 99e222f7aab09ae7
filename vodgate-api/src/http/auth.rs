//! Shared-password gate
//!
//! There are no sessions: a successful verify hands back the password hash,
//! which the client keeps as its token.

use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use vodgate_core::access::password_hash;

use crate::http::{AppResult, AppState};

pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/check", get(check))
        .route("/api/auth/verify", post(verify))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheckResponse {
    pub require_password: bool,
    pub multi_user_mode: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_enabled: Option<bool>,
}

pub async fn check(State(state): State<AppState>) -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse {
        require_password: state.access.require_password(),
        multi_user_mode: state.access.multi_user(),
    })
}

/// Verify a password.
///
/// A wrong password is not an HTTP error; it answers `{"success": false}`.
pub async fn verify(State(state): State<AppState>, body: Bytes) -> AppResult<Json<VerifyResponse>> {
    let request: VerifyRequest = serde_json::from_slice(&body)?;
    let password = request.password.unwrap_or_default();

    if !state.access.verify(&password) {
        debug!("Password rejected");
        return Ok(Json(VerifyResponse {
            success: false,
            password_hash: None,
            sync_enabled: None,
        }));
    }

    Ok(Json(VerifyResponse {
        success: true,
        password_hash: Some(password_hash(&password)),
        sync_enabled: Some(false),
    }))
}
