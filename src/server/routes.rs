//! Signup and login endpoints.

use super::ServerState;
use crate::error::PortalError;
use crate::model::PublicUser;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Request to create an account
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request to check credentials
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of every response without a payload
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: PublicUser,
}

/// Bad credentials are a 401; every other failure is a generic 500 so no
/// detail about accounts leaks to the caller.
impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PortalError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Login failed"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Server error"),
        };
        (status, Json(MessageResponse::new(message))).into_response()
    }
}

/// Routes mounted under /api
pub fn routes() -> Router<Arc<ServerState>> {
    Router::new()
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
}

/// POST /api/signup
async fn signup_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<MessageResponse>, PortalError> {
    let email = request.email.clone();
    let user = state
        .with_portal(move |p| p.signup(&request.email, &request.password, &request.name))
        .await
        .inspect_err(|e| warn!(email = %email, "signup failed: {e}"))?;

    info!(email = %user.email, "account created over http");
    Ok(Json(MessageResponse::new("Signup complete")))
}

/// POST /api/login
async fn login_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, PortalError> {
    let email = request.email.clone();
    let user = state
        .with_portal(move |p| p.check_login(&request.email, &request.password))
        .await
        .inspect_err(|e| warn!(email = %email, "login failed: {e}"))?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user: PublicUser::from(&user),
    }))
}
