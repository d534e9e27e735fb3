//! Patch extraction for a batch of Jules sessions.
//!
//! Each session id is handled on its own: a bad id, a failing helper, or a
//! session without a patch is reported and the batch moves on.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use console::style;

use crate::artifacts::{ExtractedPatch, fetch_artifacts, find_first_patch, parse_artifacts_output};
use crate::config::JulesConfig;
use crate::errors::ExtractError;

/// A validated session id: one or more ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(ExtractError::InvalidSessionId(s.to_string()))
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Paths written for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPatch {
    pub patch_path: PathBuf,
    pub message_path: PathBuf,
}

/// Write `<id>.patch` (with a trailing newline) and `<id>_msg.txt` into
/// `output_dir`, creating it if needed. Existing files are overwritten.
pub fn write_patch_files(
    output_dir: &Path,
    session_id: &SessionId,
    patch: &ExtractedPatch,
) -> Result<WrittenPatch, ExtractError> {
    std::fs::create_dir_all(output_dir).map_err(|source| ExtractError::WriteFailed {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let patch_path = output_dir.join(format!("{}.patch", session_id));
    std::fs::write(&patch_path, format!("{}\n", patch.patch)).map_err(|source| {
        ExtractError::WriteFailed {
            path: patch_path.clone(),
            source,
        }
    })?;

    let message_path = output_dir.join(format!("{}_msg.txt", session_id));
    std::fs::write(&message_path, &patch.commit_message).map_err(|source| {
        ExtractError::WriteFailed {
            path: message_path.clone(),
            source,
        }
    })?;

    Ok(WrittenPatch {
        patch_path,
        message_path,
    })
}

/// Outcome for one requested id.
#[derive(Debug)]
pub struct SessionOutcome {
    pub session_id: String,
    pub result: Result<WrittenPatch, ExtractError>,
}

/// Outcomes for a whole batch, in request order.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub outcomes: Vec<SessionOutcome>,
}

impl ExtractionReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn extracted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn all_failed(&self) -> bool {
        self.extracted() == 0
    }
}

/// Fetches artifacts through the helper script and writes patch files.
pub struct PatchExtractor {
    api_script: PathBuf,
    output_dir: PathBuf,
    timeout: Duration,
}

impl PatchExtractor {
    pub fn new(api_script: PathBuf, output_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            api_script,
            output_dir,
            timeout,
        }
    }

    pub fn from_config(config: &JulesConfig) -> Self {
        Self::new(
            config.api_script.clone(),
            config.output_dir.clone(),
            config.timeout,
        )
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Extract the first usable patch for one raw session id.
    pub async fn extract(&self, raw_id: &str) -> Result<WrittenPatch, ExtractError> {
        let session_id: SessionId = raw_id.parse()?;

        let raw = fetch_artifacts(&self.api_script, session_id.as_str(), self.timeout).await?;
        let responses = parse_artifacts_output(&raw);
        tracing::debug!(session = %session_id, documents = responses.len(), "parsed artifacts");

        let patch = find_first_patch(&responses, session_id.as_str())
            .ok_or_else(|| ExtractError::NoPatch(session_id.to_string()))?;

        write_patch_files(&self.output_dir, &session_id, &patch)
    }

    /// Process every id in order, reporting progress as it goes. One id's
    /// failure never stops the others.
    pub async fn extract_all(&self, session_ids: &[String]) -> ExtractionReport {
        let mut report = ExtractionReport::default();

        for raw_id in session_ids {
            println!("{} Fetching session {}...", style("→").cyan(), raw_id);

            let result = self.extract(raw_id).await;
            match &result {
                Ok(written) => {
                    tracing::debug!(path = %written.patch_path.display(), "wrote patch");
                    println!("{} Extracted {}.patch", style("✓").green(), raw_id);
                }
                Err(ExtractError::Artifacts(e)) => {
                    tracing::debug!(session = %raw_id, error = %e, "artifact helper failed");
                    eprintln!("{} Failed for {}", style("✗").red(), raw_id);
                }
                Err(e) => eprintln!("{} {}", style("✗").red(), e),
            }

            report.outcomes.push(SessionOutcome {
                session_id: raw_id.clone(),
                result,
            });
        }

        report
    }
}
