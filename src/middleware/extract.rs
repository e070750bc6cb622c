//! Handler-side access to the renderer

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use super::response;
use super::RequestScope;
use crate::error::{InertiaError, Result};
use crate::header::RequestInfo;
use crate::render::{RenderContext, Renderer};
use crate::validation::{self, FlashStore, ValidationErrorer};

/// Extractor binding the renderer to the current request.
///
/// Requires the Inertia middleware on the route.
#[derive(Debug, Clone)]
pub struct Inertia {
    renderer: Arc<Renderer>,
    request: Arc<RequestInfo>,
    cancel: CancellationToken,
}

impl Inertia {
    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Token cancelled when the client goes away.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn render(&self, component: &str, ctx: RenderContext) -> Result<Response> {
        self.renderer
            .render(&self.request, component, ctx, self.cancel.clone())
            .await
    }

    pub fn location(&self, url: &str) -> Result<Response> {
        response::location(&self.request, url)
    }

    pub fn redirect(&self, url: &str) -> Result<Response> {
        response::redirect(&self.request.method, url)
    }

    pub fn redirect_back(&self, fallback: &str) -> Result<Response> {
        response::redirect_back(&self.request, fallback)
    }

    /// Flash `errors` for `client` and send the user back.
    pub async fn fail_validation(
        &self,
        store: &dyn FlashStore,
        client: &str,
        errors: &dyn ValidationErrorer,
        fallback: &str,
    ) -> Result<Response> {
        validation::fail_validation(&self.request, store, client, errors, fallback).await
    }
}

/// Rejection when the middleware was not mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingRenderer;

impl IntoResponse for MissingRenderer {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            InertiaError::MissingRenderer.to_string(),
        )
            .into_response()
    }
}

impl From<MissingRenderer> for InertiaError {
    fn from(_: MissingRenderer) -> Self {
        InertiaError::MissingRenderer
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Inertia
where
    S: Send + Sync,
{
    type Rejection = MissingRenderer;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let renderer = parts
            .extensions
            .get::<Arc<Renderer>>()
            .cloned()
            .ok_or(MissingRenderer)?;
        let scope = parts
            .extensions
            .get::<RequestScope>()
            .cloned()
            .ok_or(MissingRenderer)?;

        Ok(Self {
            renderer,
            request: scope.request,
            cancel: scope.cancel,
        })
    }
}
