//! Thin HTTP client for the facegated API.

use anyhow::{bail, Context, Result};
use base64::Engine as _;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GatewayClient {
    http: reqwest::Client,
    base: String,
}

impl GatewayClient {
    pub fn new(server: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base: server.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// POST the raw image bytes to `/recognize`.
    pub async fn recognize(&self, image: &Path) -> Result<Value> {
        let bytes = read_image(image).await?;
        let resp = self
            .http
            .post(self.url("/recognize"))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .context("recognize request failed")?;
        into_json(resp).await
    }

    pub async fn enroll(&self, name: &str, image: &Path) -> Result<Value> {
        let bytes = read_image(image).await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let resp = self
            .http
            .post(self.url("/admin/add_face"))
            .json(&json!({ "name": name, "image": encoded }))
            .send()
            .await
            .context("add_face request failed")?;
        into_json(resp).await
    }

    pub async fn remove(&self, name: &str) -> Result<Value> {
        let resp = self
            .http
            .post(self.url("/admin/delete_face"))
            .json(&json!({ "name": name }))
            .send()
            .await
            .context("delete_face request failed")?;
        into_json(resp).await
    }

    pub async fn list(&self) -> Result<Value> {
        let resp = self
            .http
            .get(self.url("/admin/known_faces"))
            .send()
            .await
            .context("known_faces request failed")?;
        into_json(resp).await
    }

    pub async fn status(&self) -> Result<Value> {
        let resp = self
            .http
            .get(self.url("/status"))
            .send()
            .await
            .with_context(|| format!("facegated not reachable at {}", self.base))?;
        into_json(resp).await
    }
}

async fn read_image(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Decode the body; a non-2xx answer becomes an error carrying the server's message.
async fn into_json(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body: Value = resp.json().await.context("invalid JSON from facegated")?;
    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("no error message");
        bail!("facegated returned {status}: {message}");
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    async fn spawn_gateway() -> String {
        let app = Router::new()
            .route(
                "/admin/known_faces",
                get(|| async { Json(json!({ "names": ["alice"], "count": 1 })) }),
            )
            .route(
                "/admin/delete_face",
                post(|| async {
                    (
                        axum::http::StatusCode::NOT_FOUND,
                        Json(json!({ "status": "not_found", "error": "identity 'zed'" })),
                    )
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = GatewayClient::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(client.url("/status"), "http://127.0.0.1:5000/status");
    }

    #[tokio::test]
    async fn test_list_returns_body() {
        let client = GatewayClient::new(&spawn_gateway().await).unwrap();
        let body = client.list().await.unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["names"][0], "alice");
    }

    #[tokio::test]
    async fn test_error_status_carries_message() {
        let client = GatewayClient::new(&spawn_gateway().await).unwrap();
        let err = client.remove("zed").await.unwrap_err().to_string();
        assert!(err.contains("404"), "{err}");
        assert!(err.contains("identity 'zed'"), "{err}");
    }

    #[tokio::test]
    async fn test_missing_image_file() {
        let client = GatewayClient::new("http://127.0.0.1:1").unwrap();
        let err = client.recognize(Path::new("/nonexistent/frame.jpg")).await.unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
