//! Runtime configuration for the Jules helpers.
//!
//! Settings are layered the same way for both commands:
//! CLI flag → environment variable → default relative to the project dir.
//!
//! | Setting       | Default                                  |
//! |---------------|------------------------------------------|
//! | `env_file`    | `<project>/.env`                         |
//! | `api_base`    | `https://jules.googleapis.com/v1alpha`   |
//! | `api_script`  | `<project>/.agent/scripts/jules-api.sh`  |
//! | `output_dir`  | `<project>/.agent/tmp`                   |
//!
//! The only secret, `JULES_API_KEY`, is read from the dotenv file on demand
//! by [`load_api_key`]; it is never exported into the process environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::errors::CredentialError;

pub const DEFAULT_API_BASE: &str = "https://jules.googleapis.com/v1alpha";

/// Name of the dotenv entry holding the API key.
pub const API_KEY_VAR: &str = "JULES_API_KEY";

/// Maximum number of sessions requested from the API. No pagination beyond this.
pub const SESSION_PAGE_SIZE: u32 = 50;

/// Upper bound on every subprocess and HTTP call.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Optional overrides collected from CLI flags and environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub env_file: Option<PathBuf>,
    pub api_base: Option<String>,
    pub api_script: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Resolved configuration shared by the `review` and `extract` commands.
#[derive(Debug, Clone)]
pub struct JulesConfig {
    pub project_dir: PathBuf,
    pub env_file: PathBuf,
    pub api_base: String,
    pub api_script: PathBuf,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

impl JulesConfig {
    pub fn new(project_dir: PathBuf, overrides: ConfigOverrides) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;

        let env_file = overrides
            .env_file
            .unwrap_or_else(|| project_dir.join(".env"));
        let api_base = overrides
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let api_script = overrides
            .api_script
            .unwrap_or_else(|| project_dir.join(".agent/scripts/jules-api.sh"));
        let output_dir = overrides
            .output_dir
            .unwrap_or_else(|| project_dir.join(".agent/tmp"));

        Ok(Self {
            project_dir,
            env_file,
            api_base,
            api_script,
            output_dir,
            timeout: COMMAND_TIMEOUT,
        })
    }

    /// Load the API key from the configured dotenv file.
    pub fn api_key(&self) -> Result<ApiKey, CredentialError> {
        load_api_key(&self.env_file)
    }
}

/// A Jules API key. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Read `JULES_API_KEY` from a dotenv-style file.
///
/// The first entry with that name and a non-blank value wins; the value is
/// trimmed. Lines the dotenv parser rejects are skipped rather than failing
/// the whole file.
pub fn load_api_key(path: &Path) -> Result<ApiKey, CredentialError> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CredentialError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(CredentialError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    for entry in entries {
        match entry {
            Ok((key, value)) if key == API_KEY_VAR => {
                let value = value.trim();
                if !value.is_empty() {
                    return Ok(ApiKey::new(value));
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "skipping unparsable dotenv line"),
        }
    }

    Err(CredentialError::MissingKey {
        key: API_KEY_VAR.to_string(),
        path: path.to_path_buf(),
    })
}
