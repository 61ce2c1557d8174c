//! Authenticator - hands out credentials that cover an operation's scopes
//!
//! Manages the complete OAuth2 lifecycle for one integration:
//! - In-process caching of the stored credential
//! - Token refresh on expiry
//! - Browser-based PKCE authorization when nothing usable is stored
//!
//! At most one refresh or interactive flow runs at a time in the whole
//! process. Every integration redirects to the same callback port, so the
//! lock is shared by all authenticators, not held per integration.

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;
use crate::Result;
use crate::error::Error;
use super::callback_server::{redirect_uri, CallbackServer};
use super::client_secrets::ClientSecrets;
use super::credentials::{Credential, CredentialStore, ScopeSet};
use super::pkce::{generate_state, PkcePair};

/// Obtains fresh credentials from the identity provider
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    /// Run the interactive authorization-code exchange for `scopes`
    async fn authorize(&self, scopes: &ScopeSet) -> Result<Credential>;

    /// Exchange the refresh token of `credential` for a new access token
    async fn refresh(&self, credential: &Credential) -> Result<Credential>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    code_verifier: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'a str,
}

/// Authorization-code grant with PKCE against a real identity provider
#[derive(Clone)]
pub struct OAuthFlow {
    client: ClientSecrets,
    http_client: Client,
    callback_port: u16,
    callback_timeout: Duration,
}

impl OAuthFlow {
    pub fn new(client: ClientSecrets, callback_port: u16, callback_timeout: Duration, http_timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http_client,
            callback_port,
            callback_timeout,
        })
    }

    fn build_auth_url(&self, scopes: &ScopeSet, code_challenge: &str, state: &str, redirect: &str) -> Result<String> {
        let mut url = Url::parse(&self.client.auth_uri)
            .map_err(|e| Error::Config(format!("Invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client.client_id)
            .append_pair("redirect_uri", redirect)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.joined())
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str, redirect: &str, requested: &ScopeSet) -> Result<Credential> {
        let request = TokenExchangeRequest {
            client_id: &self.client.client_id,
            client_secret: &self.client.client_secret,
            code,
            code_verifier,
            redirect_uri: redirect,
            grant_type: "authorization_code",
        };

        let token = self.post_token(&request, "Token exchange").await?;
        let scopes = granted_scopes(token.scope.as_deref(), requested);
        Ok(Credential::new(token.access_token, token.refresh_token, token.expires_in, scopes))
    }

    async fn post_token<T: Serialize + ?Sized>(&self, form: &T, what: &str) -> Result<TokenResponse> {
        let response = self.http_client
            .post(&self.client.token_uri)
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(Error::OAuth(format!("{} failed: {}", what, error_text)));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AuthorizationFlow for OAuthFlow {
    async fn authorize(&self, scopes: &ScopeSet) -> Result<Credential> {
        let pkce = PkcePair::new();
        let state = generate_state();
        let redirect = redirect_uri(self.callback_port);

        // Bind before handing out the URL so the redirect cannot beat us
        let server = CallbackServer::bind(self.callback_port).await?;
        let auth_url = self.build_auth_url(scopes, &pkce.challenge, &state, &redirect)?;

        println!("\nOpening browser for authorization...\n");
        println!("If the browser doesn't open, visit this URL:\n{}\n", auth_url);

        if let Err(e) = open::that(&auth_url) {
            tracing::warn!("Failed to open browser: {}", e);
        }

        let result = server.wait_for_code(Some(&state), self.callback_timeout).await?;
        tracing::info!("Authorization code received, exchanging for token");

        self.exchange_code(&result.code, &pkce.verifier, &redirect, scopes).await
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential.refresh_token.as_deref()
            .ok_or_else(|| Error::OAuth("Credential has no refresh token".to_string()))?;

        let request = RefreshRequest {
            client_id: &self.client.client_id,
            client_secret: &self.client.client_secret,
            refresh_token,
            grant_type: "refresh_token",
        };

        let token = self.post_token(&request, "Token refresh").await?;

        // Providers usually omit the refresh token on refresh
        let refresh = token.refresh_token.or_else(|| Some(refresh_token.to_string()));
        let scopes = granted_scopes(token.scope.as_deref(), &credential.scopes);
        Ok(Credential::new(token.access_token, refresh, token.expires_in, scopes))
    }
}

fn granted_scopes(reported: Option<&str>, fallback: &ScopeSet) -> ScopeSet {
    match reported {
        Some(scope) if !scope.trim().is_empty() => ScopeSet::from_delimited(scope),
        _ => fallback.clone(),
    }
}

/// Lock taken around every refresh and interactive flow in the process
fn process_flow_lock() -> Arc<Mutex<()>> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone()
}

/// Lazily authenticates one integration and caches the result
pub struct Authenticator {
    store: CredentialStore,
    flow: Arc<dyn AuthorizationFlow>,
    /// Scopes fixed at construction; a request outside them is refused
    scopes: ScopeSet,
    /// In-memory copy of the stored credential; serializes callers of this integration
    cached: Mutex<Option<Credential>>,
    /// Shared with every other authenticator in the process
    flow_lock: Arc<Mutex<()>>,
}

impl Authenticator {
    pub fn new(store: CredentialStore, flow: Arc<dyn AuthorizationFlow>, scopes: ScopeSet) -> Self {
        Self {
            store,
            flow,
            scopes,
            cached: Mutex::new(None),
            flow_lock: process_flow_lock(),
        }
    }

    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Return a credential covering `required`, authenticating if needed
    pub async fn ensure_credential(&self, required: &ScopeSet) -> Result<Credential> {
        if !self.scopes.covers(required) {
            return Err(Error::Authorization(format!(
                "operation needs scopes [{}] but this gateway was configured for [{}]",
                required.joined(),
                self.scopes.joined()
            )));
        }

        let mut cached = self.cached.lock().await;

        if cached.is_none() {
            *cached = match self.load_stored().await {
                Ok(stored) => stored,
                Err(e @ Error::CorruptRecord { .. }) => {
                    tracing::warn!("{}; re-authenticating", e);
                    None
                }
                Err(e) => return Err(e),
            };
        }

        if let Some(credential) = cached.as_ref() {
            if credential.is_valid_for(required) {
                tracing::debug!("Using cached access token");
                return Ok(credential.clone());
            }
        }

        let fresh = {
            let _flow = self.flow_lock.lock().await;
            self.obtain(cached.as_ref(), required).await?
        };
        self.save_stored(fresh.clone()).await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    /// Mark `rejected` as expired if it is still the current credential, so
    /// the next call refreshes or re-authorizes instead of reusing it
    pub async fn invalidate(&self, rejected: &Credential) -> Result<()> {
        let mut cached = self.cached.lock().await;
        let stale = match cached.as_mut() {
            Some(current) if current.access_token == rejected.access_token => {
                current.expiry = Some(Utc::now());
                current.clone()
            }
            _ => return Ok(()),
        };

        tracing::warn!("Access token was rejected by the provider; it will be renewed on next use");
        self.save_stored(stale).await
    }

    /// Pass a provider result through, invalidating `credential` when the provider refused it
    pub async fn screen<T>(&self, credential: &Credential, result: Result<T>) -> Result<T> {
        if let Err(Error::CredentialRejected(_)) = &result {
            if let Err(e) = self.invalidate(credential).await {
                tracing::warn!("Failed to invalidate rejected credential: {}", e);
            }
        }
        result
    }

    async fn load_stored(&self) -> Result<Option<Credential>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| Error::Other(format!("Credential load task failed: {}", e)))?
    }

    async fn save_stored(&self, credential: Credential) -> Result<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&credential))
            .await
            .map_err(|e| Error::Other(format!("Credential save task failed: {}", e)))?
    }

    async fn obtain(&self, current: Option<&Credential>, required: &ScopeSet) -> Result<Credential> {
        if let Some(credential) = current {
            if credential.scopes.covers(required) && credential.can_refresh() {
                tracing::info!("Access token expired, refreshing");
                match self.flow.refresh(credential).await {
                    Ok(refreshed) => return Ok(refreshed),
                    Err(e) => tracing::warn!("Token refresh failed: {}, re-authenticating", e),
                }
            }
        }

        tracing::info!("No valid token for [{}], starting OAuth2 flow", required.joined());
        let credential = self.flow.authorize(&self.scopes).await?;

        if !credential.scopes.covers(required) {
            return Err(Error::Authorization(format!(
                "granted scopes [{}] do not include [{}]",
                credential.scopes.joined(),
                required.joined()
            )));
        }
        Ok(credential)
    }

    /// Whether a stored credential exists that is usable or refreshable
    pub fn has_valid_credentials(&self) -> Result<bool> {
        match self.store.load()? {
            Some(creds) => Ok(creds.scopes.covers(&self.scopes) && (!creds.is_expired() || creds.can_refresh())),
            None => Ok(false),
        }
    }

    /// Forget the cached and stored credential
    pub async fn sign_out(&self) -> Result<()> {
        let mut cached = self.cached.lock().await;
        *cached = None;
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.delete())
            .await
            .map_err(|e| Error::Other(format!("Credential delete task failed: {}", e)))?
    }
}
