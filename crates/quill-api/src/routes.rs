use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use quill_db::Database;

use crate::auth::{self, AuthService};
use crate::prompts::{self, PromptService};
use crate::token::TokenKeys;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler can reach. Built once at startup, read-only afterwards.
pub struct AppStateInner {
    pub auth: AuthService,
    pub prompts: PromptService,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, tokens: TokenKeys) -> AppState {
        Arc::new(Self {
            auth: AuthService::new(db.clone(), tokens),
            prompts: PromptService::new(db),
        })
    }
}

/// The served application: every route plus permissive CORS, request tracing,
/// and a cap on request body size.
pub fn app(state: AppState, body_limit_bytes: usize) -> Router {
    router(state)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// All routes, with the API mounted under `/api/v1`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/profile", get(auth::profile))
        .route("/save-prompt", post(prompts::save_prompt))
        .route("/get-prompts", get(prompts::get_prompts))
        .route("/delete-prompt", post(prompts::delete_prompts));

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", api)
        .with_state(state)
}

async fn root() -> &'static str {
    "Hello from the backend server!"
}
