//! Session artifacts: fetching them through the helper script and picking
//! the first usable patch out of their change-sets.
//!
//! The helper prints one JSON document per artifact. Each document may carry
//! `changeSets`, and each change-set holds its patch either as a structured
//! `gitPatch` or as a plain `diff` string.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::errors::ArtifactError;
use crate::util::{CommandOutcome, RunError, lenient_list, run_with_timeout};

/// One JSON document printed by the artifact helper.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactsResponse {
    /// Change-sets that do not decode are dropped individually.
    #[serde(default, deserialize_with = "lenient_list")]
    pub change_sets: Option<Vec<ChangeSet>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    #[serde(default)]
    pub git_patch: Option<GitPatch>,
    #[serde(default)]
    pub diff: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitPatch {
    #[serde(default)]
    pub unidiff_patch: Option<String>,
    #[serde(default)]
    pub suggested_commit_message: Option<String>,
}

/// The two representations a change-set can carry its patch in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSource<'a> {
    GitPatch {
        unidiff_patch: &'a str,
        suggested_commit_message: Option<&'a str>,
    },
    RawDiff {
        diff: &'a str,
    },
}

impl<'a> PatchSource<'a> {
    /// A present `gitPatch` always takes precedence, even when its
    /// `unidiffPatch` is empty; `diff` is only consulted without one.
    pub fn from_change_set(change_set: &'a ChangeSet) -> Option<Self> {
        match (&change_set.git_patch, &change_set.diff) {
            (Some(git_patch), _) => Some(PatchSource::GitPatch {
                unidiff_patch: git_patch.unidiff_patch.as_deref().unwrap_or(""),
                suggested_commit_message: git_patch.suggested_commit_message.as_deref(),
            }),
            (None, Some(diff)) => Some(PatchSource::RawDiff {
                diff: diff.as_str(),
            }),
            (None, None) => None,
        }
    }

    pub fn patch_text(&self) -> &'a str {
        match *self {
            PatchSource::GitPatch { unidiff_patch, .. } => unidiff_patch,
            PatchSource::RawDiff { diff } => diff,
        }
    }

    /// Patch text plus commit message. The suggested message is written
    /// as-is when present; `Jules session <id>` is used for raw diffs and for
    /// git patches that carry no suggestion at all.
    pub fn extract(&self, session_id: &str) -> ExtractedPatch {
        let commit_message = match self {
            PatchSource::GitPatch {
                suggested_commit_message: Some(msg),
                ..
            } => msg.to_string(),
            _ => format!("Jules session {}", session_id),
        };
        ExtractedPatch {
            patch: self.patch_text().to_string(),
            commit_message,
        }
    }
}

/// A patch ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPatch {
    pub patch: String,
    pub commit_message: String,
}

/// Parse the helper's output into artifact documents.
///
/// The output is first read as a stream of JSON values, which accepts both
/// compact one-per-line and pretty-printed documents. If the stream contains
/// noise, parsing falls back to one document per non-empty line and silently
/// drops the lines that do not parse. Values that are not artifact objects
/// are dropped either way.
pub fn parse_artifacts_output(raw: &str) -> Vec<ArtifactsResponse> {
    let stream: Result<Vec<serde_json::Value>, _> = serde_json::Deserializer::from_str(raw)
        .into_iter::<serde_json::Value>()
        .collect();

    match stream {
        Ok(values) => values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect(),
        Err(e) => {
            tracing::debug!(error = %e, "artifact output is not a clean JSON stream, parsing per line");
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .filter_map(|line| serde_json::from_str::<ArtifactsResponse>(line).ok())
                .collect()
        }
    }
}

/// First change-set, in document then change-set order, with a non-empty patch.
pub fn find_first_patch(responses: &[ArtifactsResponse], session_id: &str) -> Option<ExtractedPatch> {
    responses
        .iter()
        .filter_map(|response| response.change_sets.as_deref())
        .flatten()
        .filter_map(PatchSource::from_change_set)
        .find(|source| !source.patch_text().is_empty())
        .map(|source| source.extract(session_id))
}

/// Run `<script> get-artifacts <session_id>` and return its stdout.
///
/// stdin is closed and stderr discarded. A non-zero exit or timeout fails the
/// call without returning any partial output.
pub async fn fetch_artifacts(
    script: &Path,
    session_id: &str,
    limit: Duration,
) -> Result<String, ArtifactError> {
    let mut cmd = Command::new(script);
    cmd.arg("get-artifacts")
        .arg(session_id)
        .stderr(Stdio::null());

    let output = match run_with_timeout(&mut cmd, limit).await {
        Ok(CommandOutcome::Completed(output)) => output,
        Ok(CommandOutcome::TimedOut) => return Err(ArtifactError::TimedOut(limit)),
        Err(RunError::Spawn(source)) => {
            return Err(ArtifactError::SpawnFailed {
                path: script.to_path_buf(),
                source,
            });
        }
        Err(RunError::Wait(e)) => return Err(ArtifactError::Wait(e)),
    };

    if !output.status.success() {
        return Err(ArtifactError::NonZeroExit {
            code: output.status.code().unwrap_or(-1),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_script(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let script_path = dir.join(name);
        std::fs::write(&script_path, content).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&script_path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&script_path, perms).unwrap();
        }
        script_path
    }

    // ── parse_artifacts_output ──────────────────────────────────────

    #[test]
    fn test_parse_compact_lines() {
        let raw = "{\"changeSets\":[{\"diff\":\"a\"}]}\n{}\n";
        let parsed = parse_artifacts_output(raw);
        assert_eq!(parsed.len(), 2);
        assert!(parsed[1].change_sets.is_none());
    }

    #[test]
    fn test_parse_pretty_printed_documents() {
        let raw = r#"{
  "changeSets": [
    { "diff": "raw diff" }
  ]
}
{
  "name": "other"
}
"#;
        let parsed = parse_artifacts_output(raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].change_sets.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let raw = "{\"changeSets\":[]}\nnot json at all\n\n{\"changeSets\":[{\"diff\":\"d\"}]}\n";
        let parsed = parse_artifacts_output(raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed[1].change_sets.as_ref().unwrap()[0].diff.as_deref(),
            Some("d")
        );
    }

    #[test]
    fn test_parse_drops_non_object_values() {
        let parsed = parse_artifacts_output("42\n\"text\"\n{}\n");
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_artifacts_output("").is_empty());
        assert!(parse_artifacts_output("\n\n").is_empty());
    }

    // ── find_first_patch ────────────────────────────────────────────

    #[test]
    fn test_git_patch_after_object_without_change_sets() {
        let raw = concat!(
            "{\"name\":\"no change sets\"}\n",
            "{\"changeSets\":[{\"gitPatch\":{\"unidiffPatch\":\"diff text\",\"suggestedCommitMessage\":\"fix bug\"}}]}\n"
        );
        let parsed = parse_artifacts_output(raw);

        let patch = find_first_patch(&parsed, "456").unwrap();
        assert_eq!(patch.patch, "diff text");
        assert_eq!(patch.commit_message, "fix bug");
    }

    #[test]
    fn test_raw_diff_uses_fallback_message() {
        let parsed = parse_artifacts_output("{\"changeSets\":[{\"diff\":\"raw diff\"}]}");

        let patch = find_first_patch(&parsed, "789").unwrap();
        assert_eq!(patch.patch, "raw diff");
        assert_eq!(patch.commit_message, "Jules session 789");
    }

    #[test]
    fn test_first_non_empty_patch_wins() {
        let raw = concat!(
            "{\"changeSets\":[{\"diff\":\"\"},{\"gitPatch\":{\"unidiffPatch\":\"first\",\"suggestedCommitMessage\":\"m1\"}}]}\n",
            "{\"changeSets\":[{\"diff\":\"second\"}]}\n"
        );
        let parsed = parse_artifacts_output(raw);

        let patch = find_first_patch(&parsed, "1").unwrap();
        assert_eq!(patch.patch, "first");
        assert_eq!(patch.commit_message, "m1");
    }

    #[test]
    fn test_git_patch_without_text_does_not_fall_back_to_diff() {
        let parsed = parse_artifacts_output(
            "{\"changeSets\":[{\"gitPatch\":{\"suggestedCommitMessage\":\"m\"},\"diff\":\"ignored\"}]}",
        );
        assert!(find_first_patch(&parsed, "1").is_none());
    }

    #[test]
    fn test_git_patch_without_message_uses_fallback() {
        let parsed =
            parse_artifacts_output("{\"changeSets\":[{\"gitPatch\":{\"unidiffPatch\":\"p\"}}]}");

        let patch = find_first_patch(&parsed, "12").unwrap();
        assert_eq!(patch.commit_message, "Jules session 12");
    }

    #[test]
    fn test_malformed_change_set_is_skipped() {
        let parsed =
            parse_artifacts_output("{\"changeSets\":[{\"gitPatch\":\"weird\"},{\"diff\":\"good diff\"}]}\n");
        assert_eq!(parsed.len(), 1);

        let patch = find_first_patch(&parsed, "5").unwrap();
        assert_eq!(patch.patch, "good diff");
        assert_eq!(patch.commit_message, "Jules session 5");
    }

    #[test]
    fn test_blank_suggested_message_is_kept() {
        let parsed = parse_artifacts_output(
            "{\"changeSets\":[{\"gitPatch\":{\"unidiffPatch\":\"p\",\"suggestedCommitMessage\":\"  \"}}]}",
        );

        let patch = find_first_patch(&parsed, "12").unwrap();
        assert_eq!(patch.commit_message, "  ");
    }

    #[test]
    fn test_no_change_sets_yields_none() {
        let parsed = parse_artifacts_output("{}\n{\"changeSets\":[]}\n");
        assert!(find_first_patch(&parsed, "1").is_none());
    }

    #[test]
    fn test_patch_source_from_change_set() {
        let change_set = ChangeSet {
            git_patch: None,
            diff: Some("d".to_string()),
        };
        assert_eq!(
            PatchSource::from_change_set(&change_set),
            Some(PatchSource::RawDiff { diff: "d" })
        );
        assert_eq!(PatchSource::from_change_set(&ChangeSet::default()), None);
    }

    // ── fetch_artifacts ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_fetch_artifacts_passes_arguments() {
        let dir = tempdir().unwrap();
        let script = create_test_script(
            dir.path(),
            "jules-api.sh",
            "#!/bin/sh\necho \"{\\\"args\\\":\\\"$1 $2\\\"}\"\necho noise >&2\n",
        );

        let out = fetch_artifacts(&script, "456", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.trim(), "{\"args\":\"get-artifacts 456\"}");
    }

    #[tokio::test]
    async fn test_fetch_artifacts_non_zero_exit() {
        let dir = tempdir().unwrap();
        let script = create_test_script(dir.path(), "jules-api.sh", "#!/bin/sh\necho '{}'\nexit 3\n");

        let err = fetch_artifacts(&script, "1", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::NonZeroExit { code: 3 }));
    }

    #[tokio::test]
    async fn test_fetch_artifacts_timeout() {
        let dir = tempdir().unwrap();
        let script = create_test_script(dir.path(), "jules-api.sh", "#!/bin/sh\nsleep 10\n");

        let err = fetch_artifacts(&script, "1", Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::TimedOut(_)));
    }

    #[tokio::test]
    async fn test_fetch_artifacts_missing_script() {
        let dir = tempdir().unwrap();

        let err = fetch_artifacts(&dir.path().join("missing.sh"), "1", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::SpawnFailed { .. }));
    }
}
