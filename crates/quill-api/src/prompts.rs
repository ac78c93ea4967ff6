use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use quill_db::Database;
use quill_db::models::format_timestamp;
use quill_types::api::{
    DeletePromptsRequest, DeletePromptsResponse, MessageResponse, PromptResponse, PromptsQuery,
    PromptsResponse, SavePromptRequest,
};
use quill_types::models::Prompt;

use crate::error::{ApiError, require};
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::AppState;

const USERNAME_REQUIRED: &str = "Username is required";

/// Save, list, and bulk-delete prompts keyed by username. The username is
/// never checked against registered users.
pub struct PromptService {
    db: Arc<Database>,
}

impl PromptService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn save(&self, prompt: Option<String>, username: Option<String>) -> Result<Prompt, ApiError> {
        let saved = Prompt {
            id: Uuid::new_v4(),
            prompt,
            username,
            created_at: Utc::now(),
        };

        let db = self.db.clone();
        let row = saved.clone();
        tokio::task::spawn_blocking(move || {
            db.insert_prompt(
                &row.id.to_string(),
                row.prompt.as_deref(),
                row.username.as_deref(),
                &format_timestamp(&row.created_at),
            )
        })
        .await??;

        debug!("Saved prompt {} for {:?}", saved.id, saved.username);
        Ok(saved)
    }

    /// Every prompt for `username` in insertion order. Empty when none exist.
    pub async fn list(&self, username: Option<String>) -> Result<Vec<Prompt>, ApiError> {
        let username = require(username, USERNAME_REQUIRED)?;

        let db = self.db.clone();
        let rows = tokio::task::spawn_blocking(move || db.get_prompts_by_username(&username))
            .await??;

        let prompts = rows
            .into_iter()
            .map(|row| row.into_prompt())
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(prompts)
    }

    /// Delete every prompt for `username` and return how many went. Deleting
    /// nothing is reported as not found.
    pub async fn delete_all(&self, username: Option<String>) -> Result<usize, ApiError> {
        let username = require(username, USERNAME_REQUIRED)?;

        let db = self.db.clone();
        let name = username.clone();
        let deleted = tokio::task::spawn_blocking(move || db.delete_prompts_by_username(&name))
            .await??;

        if deleted == 0 {
            return Err(ApiError::NotFound("No prompts found for this user".to_string()));
        }

        info!("Deleted {} prompt(s) for '{}'", deleted, username);
        Ok(deleted)
    }
}

// -- Handlers --

pub async fn save_prompt(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SavePromptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.prompts.save(req.prompt, req.username).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Prompt saved successfully")),
    ))
}

pub async fn get_prompts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PromptsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let prompts = state.prompts.list(query.username).await?;

    Ok(Json(PromptsResponse {
        prompts: prompts.into_iter().map(PromptResponse::from).collect(),
    }))
}

pub async fn delete_prompts(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<DeletePromptsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.prompts.delete_all(req.username).await?;

    Ok(Json(DeletePromptsResponse {
        message: format!("{} prompt(s) deleted successfully", deleted),
        deleted,
    }))
}
