// Demo application - a small user directory served through the Inertia layer
//
// Routes:
// - GET    /           Users/Index, with the user list as a deferred prop
// - POST   /users      create a user; validation errors are flashed back
// - DELETE /users/:id  remove a user, redirecting home (302, upgraded to 303)
// - GET    /docs       external redirect through a location response

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use inertia_axum::{
    lazy, lazy_fn, DeferredOptions, FlashStore, Inertia, InertiaError, InertiaLayer,
    MemoryFlashStore, Prop, RenderContext, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;

/// Cookie identifying a visitor for the flash store
const CLIENT_COOKIE: &str = "demo_client";
const ANONYMOUS_CLIENT: &str = "anonymous";
const DOCS_URL: &str = "https://inertiajs.com";

/// Layout used when no template file is configured
pub const DEFAULT_LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{ t.title }}</title>
{{ inertia_head }}
</head>
<body>
{{ inertia_body }}
<script type="module" src="/build/app.js"></script>
</body>
</html>
"#;

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default)]
struct Directory {
    next_id: u64,
    users: Vec<User>,
}

#[derive(Clone)]
pub struct AppState {
    directory: Arc<RwLock<Directory>>,
    flash: Arc<dyn FlashStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(RwLock::new(Directory::default())),
            flash: Arc::new(MemoryFlashStore::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Inertia(#[from] InertiaError),
    #[error("user {0} not found")]
    UserNotFound(u64),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Inertia(e) if e.is_cancelled() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Inertia(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
        };

        tracing::error!("Request failed: {} - {}", status, self);

        (status, self.to_string()).into_response()
    }
}

type AppResult<T> = Result<T, AppError>;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router(state: AppState, layer: &InertiaLayer) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/users", post(create_user))
        .route("/users/:id", delete(delete_user))
        .route("/docs", get(docs))
        .layer(layer.middleware())
        .with_state(state)
}

fn client_id(headers: &HeaderMap) -> String {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CLIENT_COOKIE)
        .map(|(_, value)| value.to_string())
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn index(
    State(state): State<AppState>,
    inertia: Inertia,
    headers: HeaderMap,
) -> AppResult<Response> {
    let client = client_id(&headers);

    let mut ctx = RenderContext::new()
        .t(json!({ "title": "Users" }))
        .prop(Prop::always("now", Utc::now().to_rfc3339()))
        .prop(Prop::optional(
            "stats",
            lazy_fn(|| Ok(json!({ "generated_at": Utc::now().timestamp() }))),
        ));

    let directory = state.directory.clone();
    ctx = ctx.prop(Prop::deferred(
        "users",
        lazy(move |_ctx| {
            let directory = directory.clone();
            async move { Ok::<_, anyhow::Error>(directory.read().await.users.clone()) }
        }),
        DeferredOptions {
            group: Some("directory".to_string()),
            merge: true,
            ..Default::default()
        },
    ));

    if let Some(flash) = state.flash.take(&client).await.map_err(InertiaError::Flash)? {
        ctx = ctx.flash(flash);
    }

    Ok(inertia.render("Users/Index", ctx).await?)
}

#[derive(Debug, Deserialize)]
struct NewUser {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

impl NewUser {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.push("name", "The name field is required.");
        }
        if !self.email.contains('@') {
            errors.push("email", "The email must be a valid email address.");
        }
        errors
    }
}

async fn create_user(
    State(state): State<AppState>,
    inertia: Inertia,
    headers: HeaderMap,
    Json(input): Json<NewUser>,
) -> AppResult<Response> {
    let errors = input.validate();
    if !errors.0.is_empty() {
        let client = client_id(&headers);
        return Ok(inertia
            .fail_validation(state.flash.as_ref(), &client, &errors, "/")
            .await?);
    }

    let mut directory = state.directory.write().await;
    directory.next_id += 1;
    let user = User {
        id: directory.next_id,
        name: input.name.trim().to_string(),
        email: input.email,
    };
    tracing::info!(id = user.id, "Created user");
    directory.users.push(user);

    Ok(inertia.redirect("/")?)
}

async fn delete_user(State(state): State<AppState>, Path(id): Path<u64>) -> AppResult<Response> {
    let mut directory = state.directory.write().await;
    let before = directory.users.len();
    directory.users.retain(|u| u.id != id);
    if directory.users.len() == before {
        return Err(AppError::UserNotFound(id));
    }

    tracing::info!(id, "Deleted user");

    // Plain 302; the middleware upgrades it for Inertia requests
    Ok((StatusCode::FOUND, [(header::LOCATION, "/")]).into_response())
}

async fn docs(inertia: Inertia) -> AppResult<Response> {
    Ok(inertia.location(DOCS_URL)?)
}
