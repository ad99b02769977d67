//! Session state and durable bearer-token storage.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::paths;

/// Durable storage for the bearer token.
///
/// A single token file under the IARA home directory; absence means
/// anonymous/guest. No logic beyond presence-check.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            path: paths::token_path(),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the stored token, if any.
    pub fn load(&self) -> Option<String> {
        let token = fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    /// Persists a token, creating the parent directory if needed.
    ///
    /// # Errors
    /// Returns an error if the token file cannot be written.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, token)
            .with_context(|| format!("Failed to write token to {}", self.path.display()))
    }

    /// Removes the stored token. Missing file is not an error.
    pub fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("failed to clear token at {}: {err}", self.path.display());
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A client session: token presence plus the explicit guest flag.
///
/// A session is valid if a token is present. Guest mode permits read-only
/// browsing but not answer submission, schedule edits, or analysis.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<String>,
    pub guest: bool,
}

impl Session {
    /// Builds a session from the token store and a guest flag.
    pub fn from_store(store: &TokenStore, guest: bool) -> Self {
        Self {
            token: store.load(),
            guest,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// True when an identity-bound action must be refused inline
    /// instead of hitting the network.
    pub fn blocks_identity_actions(&self) -> bool {
        !self.is_authenticated()
    }
}
