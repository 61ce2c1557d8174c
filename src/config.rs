//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::Result;
use crate::error::Error;

/// Largest list-all bound a config may set
pub const MAX_LIST_ALL_LIMIT: usize = 5000;

/// Largest `limit` the Reddit listing endpoints accept
pub const MAX_POSTS_PER_SUBREDDIT: usize = 100;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model identifier bound into every agent
    #[serde(default = "default_model")]
    pub model: String,

    /// Directory holding OAuth client secrets and cached credentials.
    /// Relative paths resolve against the process working directory.
    #[serde(default = "default_credentials_dir")]
    pub credentials_dir: PathBuf,

    /// OAuth client secrets file name inside `credentials_dir`
    #[serde(default = "default_client_secrets_file")]
    pub client_secrets_file: String,

    #[serde(default)]
    pub oauth: OAuthConfig,

    #[serde(default)]
    pub http: HttpConfig,

    /// Upper bound on items collected by a list-all call
    #[serde(default = "default_list_all_limit")]
    pub list_all_limit: usize,

    #[serde(default)]
    pub reddit: RedditConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    /// Where generated PDF reports are written
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Root directory served by the filesystem tool server
    #[serde(default = "default_filesystem_root")]
    pub filesystem_root: PathBuf,
}

/// Local OAuth callback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Port of the local redirect listener; must match the registered redirect URI
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,

    /// How long to wait for the browser redirect
    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout for every outbound call
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

/// Fan-out limits for the topic to subreddit lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,

    #[serde(default = "default_max_subreddits")]
    pub max_subreddits: usize,

    #[serde(default = "default_posts_per_subreddit")]
    pub posts_per_subreddit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_speech_model")]
    pub model_id: String,

    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Where synthesized audio is written
    #[serde(default = "default_speech_dir")]
    pub output_dir: PathBuf,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_credentials_dir() -> PathBuf {
    PathBuf::from("credentials")
}

fn default_client_secrets_file() -> String {
    "gcp-oauth.keys.json".to_string()
}

fn default_callback_port() -> u16 {
    8080
}

fn default_auth_timeout() -> u64 {
    300
}

fn default_http_timeout() -> u64 {
    30
}

fn default_list_all_limit() -> usize {
    500
}

fn default_max_keywords() -> usize {
    5
}

fn default_max_subreddits() -> usize {
    3
}

fn default_posts_per_subreddit() -> usize {
    5
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_speech_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_output_format() -> String {
    "mp3_44100_128".to_string()
}

fn default_speech_dir() -> PathBuf {
    PathBuf::from("speech")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_filesystem_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            callback_port: default_callback_port(),
            timeout_secs: default_auth_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: default_http_timeout() }
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            max_keywords: default_max_keywords(),
            max_subreddits: default_max_subreddits(),
            posts_per_subreddit: default_posts_per_subreddit(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice_id: default_voice_id(),
            model_id: default_speech_model(),
            output_format: default_output_format(),
            output_dir: default_speech_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            credentials_dir: default_credentials_dir(),
            client_secrets_file: default_client_secrets_file(),
            oauth: OAuthConfig::default(),
            http: HttpConfig::default(),
            list_all_limit: default_list_all_limit(),
            reddit: RedditConfig::default(),
            speech: SpeechConfig::default(),
            reports_dir: default_reports_dir(),
            filesystem_root: default_filesystem_root(),
        }
    }
}

impl Config {
    /// Path of the OAuth client secrets file
    pub fn client_secrets_path(&self) -> PathBuf {
        self.credentials_dir.join(&self.client_secrets_file)
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http.timeout_secs)
    }

    /// Reject out-of-range settings instead of coercing them
    pub fn validate(&self) -> Result<()> {
        check_range("list_all_limit", self.list_all_limit, 1, MAX_LIST_ALL_LIMIT)?;
        check_range("reddit.posts_per_subreddit", self.reddit.posts_per_subreddit, 1, MAX_POSTS_PER_SUBREDDIT)?;
        check_range("reddit.max_keywords", self.reddit.max_keywords, 1, usize::MAX)?;
        check_range("reddit.max_subreddits", self.reddit.max_subreddits, 1, usize::MAX)?;
        check_range("http.timeout_secs", self.http.timeout_secs as usize, 1, usize::MAX)?;
        check_range("oauth.timeout_secs", self.oauth.timeout_secs as usize, 1, usize::MAX)?;
        if self.oauth.callback_port == 0 {
            return Err(Error::Config("oauth.callback_port must match the registered redirect URI and cannot be 0".to_string()));
        }
        Ok(())
    }
}

fn check_range(field: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if value < min || value > max {
        let bound = if max == usize::MAX { format!("at least {}", min) } else { format!("between {} and {}", min, max) };
        return Err(Error::Config(format!("{} must be {}, got {}", field, bound, value)));
    }
    Ok(())
}

/// API keys for the plain (non-OAuth) integrations, read from the environment
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub weather: Option<String>,
    pub google: Option<String>,
    pub elevenlabs: Option<String>,
    pub brave: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            weather: read("WEATHER_API_KEY"),
            google: read("GOOGLE_API_KEY"),
            elevenlabs: read("ELEVENLABS_API_KEY"),
            brave: read("BRAVE_API_KEY"),
        }
    }
}

/// Look up a key that a tool needs, or fail with a configuration error naming it
pub fn require_key<'a>(key: &'a Option<String>, env_name: &str) -> Result<&'a str> {
    key.as_deref()
        .ok_or_else(|| Error::Config(format!("{} is not set in the environment", env_name)))
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".toolgate")
}

/// Get the config file path (`TOOLGATE_CONFIG` overrides the default)
pub fn config_path() -> PathBuf {
    match std::env::var_os("TOOLGATE_CONFIG") {
        Some(path) => PathBuf::from(path),
        None => config_dir().join("config.json"),
    }
}

/// Load configuration, falling back to defaults when no file exists
pub fn load() -> Result<Config> {
    load_from(&config_path())
}

pub fn load_from(path: &std::path::Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("No config at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config at {:?}: {}", path, e)))?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

pub fn save_to(config: &Config, path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
