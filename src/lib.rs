//! Server-side adapter for the Inertia protocol on axum
//!
//! Lets an axum application drive a client-side SPA without a separate JSON
//! API. Handlers declare a component and its props; the renderer decides per
//! request which props to compute and answers with either a JSON page or an
//! HTML document embedding it.
//!
//! Architecture:
//! - `props`: prop model, resolver (partial reloads, deferred groups, merge
//!   list) and record extraction
//! - `render`: page renderer, HTML templates, SSR backends
//! - `middleware`: protocol layer (version check, 303 upgrade, empty responses)
//!   and the [`Inertia`] extractor
//! - `validation`: field errors and the flash hand-off across redirects
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{routing::get, Router};
//! use inertia_axum::{
//!     HtmlTemplate, Inertia, InertiaLayer, Prop, RenderContext, Renderer, RendererConfig,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let template = HtmlTemplate::parse("<body>{{ inertia_body }}</body>")?;
//! let renderer = Arc::new(Renderer::new(template, RendererConfig::default()));
//!
//! let app: Router = Router::new()
//!     .route(
//!         "/",
//!         get(|inertia: Inertia| async move {
//!             let ctx = RenderContext::new().prop(Prop::new("greeting", "hello"));
//!             inertia.render("Home", ctx).await.map_err(|e| e.to_string())
//!         }),
//!     )
//!     .layer(InertiaLayer::new(renderer).middleware());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod header;
pub mod middleware;
pub mod page;
pub mod props;
pub mod render;
pub mod validation;
pub mod version;

#[cfg(test)]
mod testing;

pub use error::{ExtractError, InertiaError, Result, SsrError, TemplateError};
pub use header::RequestInfo;
pub use middleware::{location, redirect, redirect_back, Inertia, InertiaLayer, MiddlewareConfig};
pub use page::Page;
pub use props::{
    extract_props, lazy, lazy_fn, DeferredGroups, DeferredOptions, Field, FieldValue, JsonRecord,
    Lazy, LazyValue, Prop, PropContext, PropKind, PropOptions, Proper, Props, PropsMap, Record,
    UntaggedPolicy,
};
pub use render::{
    HtmlTemplate, HttpSsrClient, RenderContext, Renderer, RendererConfig,
    SsrClient, SsrTemplateData, Template, TemplateData,
};
pub use validation::{
    fail_validation, Flash, FlashStore, MemoryFlashStore, ValidationError, ValidationErrorer,
    ValidationErrors,
};
