//! Server-side rendering backends

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::SsrError;
use crate::page::Page;

/// Head and body fragments produced by an SSR backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsrTemplateData {
    #[serde(default)]
    pub head: String,
    #[serde(default)]
    pub body: String,
}

/// A backend that pre-renders a page to HTML.
#[async_trait]
pub trait SsrClient: Send + Sync {
    /// Render `page`, giving up as soon as `cancel` fires.
    async fn render(
        &self,
        page: &Page,
        cancel: &CancellationToken,
    ) -> Result<SsrTemplateData, SsrError>;
}

/// SSR over HTTP: posts the page JSON and decodes `{head, body}`.
#[derive(Debug, Clone)]
pub struct HttpSsrClient {
    client: reqwest::Client,
    url: String,
}

impl HttpSsrClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SsrError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SsrError::Request(e.to_string()))?;

        Ok(Self::with_client(url, client))
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, page: &Page) -> Result<SsrTemplateData, SsrError> {
        let resp = self
            .client
            .post(&self.url)
            .json(page)
            .send()
            .await
            .map_err(|e| SsrError::Request(e.to_string()))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(SsrError::Status(status.as_u16()));
        }

        resp.json::<SsrTemplateData>()
            .await
            .map_err(|e| SsrError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SsrClient for HttpSsrClient {
    async fn render(
        &self,
        page: &Page,
        cancel: &CancellationToken,
    ) -> Result<SsrTemplateData, SsrError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SsrError::Cancelled),
            res = self.send(page) => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn page() -> Page {
        Page {
            component: "Index".into(),
            url: "/".into(),
            version: "1".into(),
            ..Default::default()
        }
    }

    fn client(url: String) -> HttpSsrClient {
        HttpSsrClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_render_posts_page() {
        let app = Router::new().route(
            "/render",
            post(|Json(page): Json<Value>| async move {
                Json(serde_json::json!({
                    "head": "<title>SSR</title>",
                    "body": format!("<div>{}</div>", page["component"].as_str().unwrap_or("")),
                }))
            }),
        );
        let base = serve(app).await;

        let data = client(format!("{}/render", base))
            .render(&page(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(data.head, "<title>SSR</title>");
        assert_eq!(data.body, "<div>Index</div>");
    }

    #[tokio::test]
    async fn test_non_ok_status_is_error() {
        let app = Router::new().route(
            "/render",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = serve(app).await;

        let err = client(format!("{}/render", base))
            .render(&page(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SsrError::Status(500)));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_error() {
        let app = Router::new().route("/render", post(|| async { "not json" }));
        let base = serve(app).await;

        let err = client(format!("{}/render", base))
            .render(&page(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SsrError::Decode(_)));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_request() {
        let app = Router::new().route(
            "/render",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "late"
            }),
        );
        let base = serve(app).await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = client(format!("{}/render", base))
            .render(&page(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, SsrError::Cancelled));
    }
}
