//! Credential storage
//!
//! One JSON record per integration, holding the OAuth token, its refresh
//! token, expiry and granted scopes. Writes go to a temp file in the same
//! directory and are renamed over the record, so readers only ever see a
//! complete credential.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::Result;
use crate::error::Error;

/// Tokens expiring within this window are treated as already expired
const EXPIRY_SKEW_MINUTES: i64 = 5;

/// Immutable set of granted or required OAuth scopes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(scopes.into_iter().map(Into::into).collect())
    }

    /// Parse the space-delimited `scope` field of a token response
    pub fn from_delimited(scopes: &str) -> Self {
        Self::new(scopes.split_whitespace())
    }

    /// True when every scope in `required` is present here
    pub fn covers(&self, required: &ScopeSet) -> bool {
        required.0.is_subset(&self.0)
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// Space-joined form used in authorization URLs
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}

/// OAuth2 credential for one integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// None means the token does not expire
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,

    #[serde(default)]
    pub scopes: ScopeSet,
}

impl Credential {
    /// Build a credential from a token response
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: ScopeSet,
    ) -> Self {
        let expiry = expires_in_secs.map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        Self {
            access_token,
            refresh_token,
            expiry,
            scopes,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + chrono::Duration::minutes(EXPIRY_SKEW_MINUTES) >= expiry,
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Usable as-is for an operation needing `required`
    pub fn is_valid_for(&self, required: &ScopeSet) -> bool {
        !self.is_expired() && self.scopes.covers(required)
    }
}

/// File-backed store for a single credential record
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential; `Ok(None)` when no record exists
    pub fn load(&self) -> Result<Option<Credential>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::CorruptRecord {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Persist a credential, replacing any previous record atomically
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let content = serde_json::to_string_pretty(credential)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        tracing::info!("Credential saved to {}", self.path.display());
        Ok(())
    }

    /// Remove the stored record, if any
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credential {
        Credential::new(
            "access".to_string(),
            Some("refresh".to_string()),
            Some(3600),
            ScopeSet::new(["read", "write"]),
        )
    }

    #[test]
    fn test_credentials_not_expired() {
        assert!(!sample().is_expired());
    }

    #[test]
    fn test_credentials_expired() {
        let mut creds = sample();
        creds.expiry = Some(Utc::now() - chrono::Duration::hours(1));
        assert!(creds.is_expired());
    }

    #[test]
    fn test_credentials_expiring_soon() {
        let creds = Credential::new("t".to_string(), None, Some(120), ScopeSet::default());
        assert!(creds.is_expired());
    }

    #[test]
    fn test_credentials_no_expiry() {
        let creds = Credential::new("t".to_string(), None, None, ScopeSet::default());
        assert!(!creds.is_expired());
        assert!(!creds.can_refresh());
    }

    #[test]
    fn test_scope_coverage() {
        let granted = ScopeSet::new(["read", "write"]);
        assert!(granted.covers(&ScopeSet::new(["read"])));
        assert!(granted.covers(&ScopeSet::default()));
        assert!(!granted.covers(&ScopeSet::new(["read", "admin"])));
        assert_eq!(ScopeSet::from_delimited("b a  a"), ScopeSet::new(["a", "b"]));
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["access_token", "expiry", "refresh_token", "scopes"]);
        assert_eq!(obj["scopes"], serde_json::json!(["read", "write"]));
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("a").join("b").join("cred.json"));
        let creds = sample();
        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), Some(creds));
    }

    #[test]
    fn test_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cred.json");
        std::fs::write(&path, "{\"access_token\": 42").unwrap();
        let store = CredentialStore::new(&path);
        assert!(matches!(store.load(), Err(Error::CorruptRecord { .. })));
    }

    #[test]
    fn test_save_of_load_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("cred.json"));
        store.save(&sample()).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        store.save(&loaded).unwrap();
        let after = std::fs::read(store.path()).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("cred.json"));
        store.save(&sample()).unwrap();
        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
        store.delete().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_record_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("cred.json"));
        store.save(&sample()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
