//! Shared subprocess and decoding helpers.

use std::process::{Output, Stdio};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// How a bounded subprocess run ended.
#[derive(Debug)]
pub enum CommandOutcome {
    Completed(Output),
    TimedOut,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to wait: {0}")]
    Wait(#[source] std::io::Error),
}

/// Run `command` with stdin closed and stdout captured, killing it if it
/// outlives `limit`.
///
/// Callers decide what happens to stderr before calling.
pub async fn run_with_timeout(
    command: &mut Command,
    limit: Duration,
) -> Result<CommandOutcome, RunError> {
    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(RunError::Spawn)?;

    match timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map(CommandOutcome::Completed).map_err(RunError::Wait),
        // Dropping the future drops the child, which kills it.
        Err(_) => Ok(CommandOutcome::TimedOut),
    }
}

/// `deserialize_with` for optional lists of remote records. Each element is
/// decoded on its own; elements that do not fit `T` are dropped.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(values.map(|values| {
        values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping undecodable list element");
                    None
                }
            })
            .collect()
    }))
}
