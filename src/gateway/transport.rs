//! HTTP transport shared by the gateways and the plain API tools

use std::time::Duration;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use crate::auth::Credential;
use crate::Result;
use crate::error::Error;

/// Build a client whose every request is bounded by `timeout`
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Map non-success statuses onto the error taxonomy
pub async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = provider_detail(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body.trim().to_string()
        }
    });

    Err(match status {
        StatusCode::UNAUTHORIZED => Error::CredentialRejected(detail),
        StatusCode::FORBIDDEN => Error::Authorization(detail),
        StatusCode::NOT_FOUND => Error::NotFound(detail),
        _ => Error::Remote { status: status.as_u16(), detail },
    })
}

/// Pull the human-readable message out of a JSON error body
fn provider_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    match error {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("message").and_then(|m| m.as_str()).map(str::to_string),
        _ => None,
    }
}

/// Bearer-authenticated access to one API base URL
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder, credential: &Credential) -> Result<Response> {
        let response = request.bearer_auth(&credential.access_token).send().await?;
        error_for_status(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, credential: &Credential, path: &str, query: &[(&str, String)]) -> Result<T> {
        tracing::debug!("GET {}", path);
        let response = self.send(self.client.get(self.url(path)).query(query), credential).await?;
        Ok(response.json().await?)
    }

    /// Fetch raw bytes, along with the content type the server reported
    pub async fn get_bytes(&self, credential: &Credential, path: &str, query: &[(&str, String)]) -> Result<(Vec<u8>, Option<String>)> {
        tracing::debug!("GET {} (bytes)", path);
        let response = self.send(self.client.get(self.url(path)).query(query), credential).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, credential: &Credential, path: &str, body: &B) -> Result<T> {
        tracing::debug!("POST {}", path);
        let response = self.send(self.client.post(self.url(path)).json(body), credential).await?;
        Ok(response.json().await?)
    }

    /// POST without a body, for action endpoints such as trash
    pub async fn post_empty<T: DeserializeOwned>(&self, credential: &Credential, path: &str) -> Result<T> {
        tracing::debug!("POST {}", path);
        let request = self.client.post(self.url(path)).header(reqwest::header::CONTENT_LENGTH, 0);
        let response = self.send(request, credential).await?;
        Ok(response.json().await?)
    }
}
