//! On-disk storage for the Slack user token.
//!
//! The token lives in a single file readable only by the owner. The
//! `SLACK_USER_TOKEN` environment variable, when set, takes priority over the
//! file so scripts can run without touching disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::CoreError;
use crate::paths::create_private_dir;

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV_VAR: &str = "SLACK_USER_TOKEN";

/// Storage for the Slack user token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a token store backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the token to disk with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, token: &str) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)
                .map_err(|e| CoreError::Path(format!("preparing token directory: {e:#}")))?;
        }

        write_private(&self.path, token.trim())?;
        log::debug!("stored token at {}", self.path.display());
        Ok(())
    }

    /// Load the token, preferring `SLACK_USER_TOKEN` over the file.
    ///
    /// Returns `None` when neither source holds a non-empty token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token file exists but cannot be read.
    pub fn load(&self) -> Result<Option<String>, CoreError> {
        let from_env = std::env::var(TOKEN_ENV_VAR).ok();
        self.load_with_env(from_env.as_deref())
    }

    /// Like [`load`](Self::load) with the environment value passed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the token file exists but cannot be read.
    pub fn load_with_env(&self, env_token: Option<&str>) -> Result<Option<String>, CoreError> {
        if let Some(token) = env_token.map(str::trim).filter(|t| !t.is_empty()) {
            log::trace!("using token from {TOKEN_ENV_VAR}");
            return Ok(Some(token.to_string()));
        }

        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::Io(e)),
        }
    }

    /// Load the token or fail with [`CoreError::TokenNotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured or the file cannot be read.
    pub fn require(&self) -> Result<String, CoreError> {
        self.load()?.ok_or(CoreError::TokenNotFound)
    }

    /// Delete the stored token. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete(&self) -> Result<(), CoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Io(e)),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> Result<(), CoreError> {
    use std::io::Write as _;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> Result<(), CoreError> {
    fs::write(path, contents)?;
    Ok(())
}
