//! Authentication module for OAuth2 and credential management
//!
//! This module provides:
//! - Credential records, scope sets and their on-disk store
//! - OAuth client secrets loading
//! - PKCE code generation for the authorization-code flow
//! - A temporary local callback server
//! - `Authenticator`, which hands out scope-covering credentials

mod pkce;
mod credentials;
mod client_secrets;
mod callback_server;
mod authenticator;

pub use credentials::{Credential, CredentialStore, ScopeSet};
pub use client_secrets::{load_client_secrets, ClientSecrets};
pub use callback_server::{redirect_uri, AuthorizationResult, CallbackServer};
pub use authenticator::{AuthorizationFlow, Authenticator, OAuthFlow};

#[cfg(test)]
pub(crate) use authenticator::testing;
