//! Repository source resolution.
//!
//! Jules tags each session with the GitHub repository it was created
//! against, as `sources/github/<owner>/<repo>`. We derive the same
//! identifier from the local `remote.origin.url`.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use crate::errors::SourceError;
use crate::util::{CommandOutcome, RunError, run_with_timeout};

// Matches both https://github.com/owner/repo(.git) and git@github.com:owner/repo(.git)
static GITHUB_REMOTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"github\.com[/:](.+?)/(.+?)(\.git)?$").unwrap());

/// Canonical source identifier, e.g. `sources/github/acme/widgets`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositorySource(String);

impl RepositorySource {
    /// Map a GitHub remote URL to its source identifier.
    ///
    /// Returns `None` for anything that is not a GitHub remote.
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let caps = GITHUB_REMOTE_REGEX.captures(url.trim())?;
        let owner = &caps[1];
        let repo = &caps[2];
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        Some(Self(format!("sources/github/{}/{}", owner, repo)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the source for the repository at `project_dir` using `git` from `PATH`.
pub async fn resolve_repository_source(
    project_dir: &Path,
    limit: Duration,
) -> Result<RepositorySource, SourceError> {
    resolve_with_git("git", project_dir, limit).await
}

/// Same as [`resolve_repository_source`] with an explicit git binary.
pub async fn resolve_with_git(
    git: &str,
    project_dir: &Path,
    limit: Duration,
) -> Result<RepositorySource, SourceError> {
    let mut cmd = Command::new(git);
    cmd.args(["config", "--get", "remote.origin.url"])
        .current_dir(project_dir)
        .stderr(Stdio::piped());

    let output = match run_with_timeout(&mut cmd, limit).await {
        Ok(CommandOutcome::Completed(output)) => output,
        Ok(CommandOutcome::TimedOut) => return Err(SourceError::TimedOut(limit)),
        Err(RunError::Spawn(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SourceError::GitNotFound);
        }
        Err(RunError::Spawn(e) | RunError::Wait(e)) => return Err(SourceError::Io(e)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("not a git repository") {
            return Err(SourceError::NotARepository {
                path: project_dir.to_path_buf(),
            });
        }
        // `git config --get` exits 1 with no output when the key is unset.
        let code = output.status.code().unwrap_or(-1);
        if code == 1 && stderr.is_empty() {
            return Err(SourceError::NoOriginRemote);
        }
        return Err(SourceError::GitFailed { code, stderr });
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        return Err(SourceError::NoOriginRemote);
    }
    tracing::debug!(%url, "resolved remote.origin.url");

    RepositorySource::from_remote_url(&url).ok_or(SourceError::UnrecognizedRemote { url })
}
