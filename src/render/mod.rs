//! Page rendering
//!
//! A [`Renderer`] is built once at startup and shared across requests. Each
//! call to [`Renderer::render`] resolves the props for one component and
//! answers with the JSON page (protocol requests) or a full HTML document
//! embedding it (plain navigations).

mod buffer;
mod ssr;
mod template;

pub use ssr::{HttpSsrClient, SsrClient, SsrTemplateData};
pub use template::{HtmlTemplate, Template, TemplateData};

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::Response;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use self::buffer::BufferPool;
use self::template::escape_html;
use crate::error::{InertiaError, Result};
use crate::header::{names, RequestInfo};
use crate::page::Page;
use crate::props::{self, Prop, PropContext, Proper};
use crate::validation::{self, Flash, ValidationErrorer};

pub const DEFAULT_ROOT_VIEW_ID: &str = "app";

const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
const CONTENT_TYPE_JSON: &str = "application/json";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Renderer settings, fixed once the renderer is built.
#[derive(Clone)]
pub struct RendererConfig {
    /// Asset version echoed into every page.
    pub version: String,
    /// `id` of the root container; empty means [`DEFAULT_ROOT_VIEW_ID`].
    pub root_view_id: String,
    /// Extra attributes on the root container. `data-page` is ignored.
    pub root_view_attrs: BTreeMap<String, String>,
    pub ssr: Option<Arc<dyn SsrClient>>,
    /// Default bound on concurrent prop resolution; 1 resolves in order.
    pub concurrency: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            root_view_id: DEFAULT_ROOT_VIEW_ID.to_string(),
            root_view_attrs: BTreeMap::new(),
            ssr: None,
            concurrency: 1,
        }
    }
}

impl fmt::Debug for RendererConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererConfig")
            .field("version", &self.version)
            .field("root_view_id", &self.root_view_id)
            .field("root_view_attrs", &self.root_view_attrs)
            .field("ssr", &self.ssr.is_some())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Render Context
// ─────────────────────────────────────────────────────────────────────────────

/// Per-render inputs: props, validation errors and template data.
#[derive(Default)]
pub struct RenderContext {
    props: Vec<Prop>,
    errorers: Vec<Box<dyn ValidationErrorer>>,
    t: Value,
    clear_history: bool,
    encrypt_history: bool,
    error_bag: Option<String>,
    concurrency: Option<usize>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a set of props, keeping their order.
    pub fn props(mut self, props: impl Proper) -> Self {
        self.props.extend(props.into_props());
        self
    }

    pub fn prop(mut self, prop: Prop) -> Self {
        self.props.push(prop);
        self
    }

    pub fn validation_errors(mut self, errors: impl ValidationErrorer + 'static) -> Self {
        self.errorers.push(Box::new(errors));
        self
    }

    /// Attach errors carried over from a previous request.
    ///
    /// A named bag in the flash takes precedence over the request header.
    pub fn flash(mut self, flash: Flash) -> Self {
        if !flash.error_bag.is_empty() {
            self.error_bag = Some(flash.error_bag);
        }
        self.errorers.push(Box::new(flash.errors));
        self
    }

    /// Opaque data handed to the HTML template as `t`.
    pub fn t(mut self, t: Value) -> Self {
        self.t = t;
        self
    }

    pub fn clear_history(mut self) -> Self {
        self.clear_history = true;
        self
    }

    pub fn encrypt_history(mut self) -> Self {
        self.encrypt_history = true;
        self
    }

    pub fn error_bag(mut self, bag: impl Into<String>) -> Self {
        self.error_bag = Some(bag.into());
        self
    }

    /// Resolve up to `n` props flagged `concurrent` at the same time.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = Some(n.max(1));
        self
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("props", &self.props)
            .field("errorers", &self.errorers.len())
            .field("clear_history", &self.clear_history)
            .field("encrypt_history", &self.encrypt_history)
            .field("error_bag", &self.error_bag)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Renderer
// ─────────────────────────────────────────────────────────────────────────────

/// Renders pages for the client runtime.
pub struct Renderer {
    template: Box<dyn Template>,
    version: String,
    root_view_id: String,
    root_view_attrs: BTreeMap<String, String>,
    ssr: Option<Arc<dyn SsrClient>>,
    concurrency: usize,
    buffers: BufferPool,
}

impl Renderer {
    pub fn new(template: impl Template + 'static, config: RendererConfig) -> Self {
        let root_view_id = if config.root_view_id.is_empty() {
            DEFAULT_ROOT_VIEW_ID.to_string()
        } else {
            config.root_view_id
        };

        Self {
            template: Box::new(template),
            version: config.version,
            root_view_id,
            root_view_attrs: config.root_view_attrs,
            ssr: config.ssr,
            concurrency: config.concurrency.max(1),
            buffers: BufferPool::default(),
        }
    }

    /// Build a renderer from an [`HtmlTemplate`] file.
    pub fn from_file(path: impl AsRef<Path>, config: RendererConfig) -> Result<Self> {
        Ok(Self::new(HtmlTemplate::from_file(path)?, config))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Resolve the page object for `component`.
    pub async fn page(
        &self,
        request: &RequestInfo,
        component: &str,
        ctx: RenderContext,
        cancel: CancellationToken,
    ) -> Result<Page> {
        let bag = ctx.error_bag.as_deref().unwrap_or(&request.error_bag);

        let mut all = ctx.props;
        all.push(validation::errors_prop(bag, &ctx.errorers));

        let prop_ctx = PropContext::new(request.clone(), cancel);
        let concurrency = ctx.concurrency.unwrap_or(self.concurrency);
        let resolved = props::resolve(&all, component, request, &prop_ctx, concurrency).await?;

        Ok(Page {
            component: component.to_string(),
            props: resolved.props,
            url: request.url.clone(),
            version: self.version.clone(),
            encrypt_history: ctx.encrypt_history,
            clear_history: ctx.clear_history,
            deferred_props: resolved.deferred,
            merge_props: resolved.merge,
        })
    }

    /// Render `component` as a JSON page or an HTML document.
    ///
    /// Nothing is written on failure; the caller decides the error response.
    pub async fn render(
        &self,
        request: &RequestInfo,
        component: &str,
        mut ctx: RenderContext,
        cancel: CancellationToken,
    ) -> Result<Response> {
        let t = std::mem::take(&mut ctx.t);
        let page = self.page(request, component, ctx, cancel.clone()).await?;

        if request.inertia {
            debug!(component, url = %page.url, "Rendering JSON page");
            let mut res = Response::new(Body::from(page.to_json()?));
            let headers = res.headers_mut();
            headers.insert(names::X_INERTIA, HeaderValue::from_static("true"));
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
            return Ok(res);
        }

        debug!(component, url = %page.url, ssr = self.ssr.is_some(), "Rendering HTML page");
        let html = match &self.ssr {
            Some(ssr) => {
                let data = ssr.render(&page, &cancel).await.map_err(|e| {
                    warn!(component, "SSR render failed: {}", e);
                    InertiaError::Ssr(e)
                })?;
                self.execute(&data.head, &data.body, &t)?
            }
            None => {
                let mut container = self.buffers.acquire();
                self.write_root_view(&page, &mut container)?;
                self.execute("", &container, &t)?
            }
        };

        let mut res = Response::new(Body::from(html));
        res.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_HTML));
        Ok(res)
    }

    fn execute(&self, head: &str, body: &str, t: &Value) -> Result<String> {
        let mut out = String::with_capacity(body.len() + 1024);
        self.template
            .render(&TemplateData { head, body, t }, &mut out)?;
        Ok(out)
    }

    /// `<div id="app" data-page="{escaped json}" ...attrs></div>`
    fn write_root_view(&self, page: &Page, out: &mut String) -> Result<()> {
        let json = serde_json::to_string(page).map_err(|source| InertiaError::Serialize {
            what: "page".to_string(),
            source,
        })?;

        out.push_str("<div id=\"");
        escape_html(out, &self.root_view_id);
        out.push_str("\" data-page=\"");
        escape_html(out, &json);
        out.push('"');

        for (k, v) in &self.root_view_attrs {
            if k == "data-page" {
                continue;
            }
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            escape_html(out, v);
            out.push('"');
        }

        out.push_str("></div>");
        Ok(())
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("version", &self.version)
            .field("root_view_id", &self.root_view_id)
            .field("ssr", &self.ssr.is_some())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
