//! OAuth client secrets
//!
//! Reads the client id/secret pair downloaded from the identity provider's
//! console (`gcp-oauth.keys.json`). Both the "installed" and "web" layouts
//! are accepted.

use std::path::Path;
use serde::Deserialize;
use crate::Result;
use crate::error::Error;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Registered OAuth client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: SecretsFile = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid OAuth client secrets: {}", e)))?;

        file.installed
            .or(file.web)
            .filter(|s| !s.client_id.is_empty())
            .ok_or_else(|| Error::Config(
                "OAuth client secrets must contain an \"installed\" or \"web\" client_id".to_string()
            ))
    }
}

/// Load client secrets, failing with a configuration error when absent
pub fn load_client_secrets(path: &Path) -> Result<ClientSecrets> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "OAuth client secrets not found at {}. Download them from the provider console.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    ClientSecrets::parse(&content)
}
