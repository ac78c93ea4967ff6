use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use quill_db::Database;
use quill_db::models::format_timestamp;
use quill_types::api::{LoginRequest, LoginResponse, MessageResponse, PublicUser, SignupRequest};

use crate::error::{ApiError, require};
use crate::extract::ApiJson;
use crate::password::{hash_password, verify_password};
use crate::routes::AppState;
use crate::token::TokenKeys;

const FIELDS_REQUIRED: &str = "All fields are required.";
const USER_EXISTS: &str = "User already exists.";

/// Signup, login, and token-gated profile lookup.
pub struct AuthService {
    db: Arc<Database>,
    tokens: TokenKeys,
}

impl AuthService {
    pub fn new(db: Arc<Database>, tokens: TokenKeys) -> Self {
        Self { db, tokens }
    }

    /// Register a new user. Does not issue a token.
    pub async fn signup(&self, req: SignupRequest) -> Result<(), ApiError> {
        let username = require(req.username, FIELDS_REQUIRED)?;
        let email = require(req.email, FIELDS_REQUIRED)?;
        let password = require(req.password, FIELDS_REQUIRED)?;

        let db = self.db.clone();
        let (name, mail) = (username.clone(), email.clone());
        let taken = tokio::task::spawn_blocking(move || {
            Ok::<_, anyhow::Error>(
                db.get_user_by_email(&mail)?.is_some() || db.get_user_by_username(&name)?.is_some(),
            )
        })
        .await??;

        if taken {
            return Err(ApiError::Conflict(USER_EXISTS.to_string()));
        }

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        let db = self.db.clone();
        let id = Uuid::new_v4().to_string();
        let created_at = format_timestamp(&Utc::now());
        let (name, mail) = (username.clone(), email);
        let inserted = tokio::task::spawn_blocking(move || {
            db.create_user(&id, &name, &mail, &password_hash, &created_at)
        })
        .await??;

        // Lost a race with a concurrent signup for the same username or email.
        if !inserted {
            return Err(ApiError::Conflict(USER_EXISTS.to_string()));
        }

        info!("Registered user '{}'", username);
        Ok(())
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ApiError> {
        let username = require(req.username, FIELDS_REQUIRED)?;
        let password = require(req.password, FIELDS_REQUIRED)?;

        let db = self.db.clone();
        let name = username.clone();
        let row = tokio::task::spawn_blocking(move || db.get_user_by_username(&name))
            .await??;

        let Some(row) = row else {
            warn!("Login failed for '{}': unknown username", username);
            return Err(ApiError::InvalidCredentials);
        };

        let user = row.into_user()?;
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;
        if !valid {
            warn!("Login failed for '{}': wrong password", username);
            return Err(ApiError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(user.id)
            .map_err(|e| ApiError::Internal(e.into()))?;

        info!("User '{}' logged in", user.username);
        Ok(LoginResponse {
            message: "Login successful".to_string(),
            token,
            user: user.public(),
        })
    }

    /// Resolve an `Authorization: Bearer <token>` header to the caller's
    /// public profile.
    pub async fn profile(&self, authorization: Option<&str>) -> Result<PublicUser, ApiError> {
        self.profile_at(authorization, Utc::now()).await
    }

    pub async fn profile_at(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PublicUser, ApiError> {
        // The token is the second space-separated word; anything after it is ignored.
        let token = authorization
            .filter(|h| h.starts_with("Bearer "))
            .and_then(|h| h.split(' ').nth(1))
            .ok_or(ApiError::Unauthorized("Unauthorized"))?;

        let claims = self
            .tokens
            .verify_at(token, now)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token"))?;

        let db = self.db.clone();
        let id = claims.sub.to_string();
        let row = tokio::task::spawn_blocking(move || db.get_user_by_id(&id)).await??;

        let user = row
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?
            .into_user()?;

        Ok(user.public())
    }
}

// -- Handlers --

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.signup(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully!")),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.auth.login(req).await?))
}

pub async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    Ok(Json(state.auth.profile(authorization).await?))
}
