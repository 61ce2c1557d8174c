//! toolgate - credentialed tool gateway for conversational agents
//!
//! This library provides the credential lifecycle, authenticated API
//! gateways and validated tool dispatch that agent shells are built from.

pub mod agent;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};
