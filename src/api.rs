//! Minimal client for the Jules sessions API.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::ApiKey;
use crate::util::lenient_list;

const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// Lifecycle state of a Jules session.
///
/// Unknown values deserialize to `Other` so new server-side states never
/// break listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    #[default]
    StateUnspecified,
    Queued,
    Planning,
    AwaitingPlanApproval,
    AwaitingUserFeedback,
    InProgress,
    Paused,
    Failed,
    Completed,
    #[serde(other)]
    Other,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::StateUnspecified => "STATE_UNSPECIFIED",
            SessionState::Queued => "QUEUED",
            SessionState::Planning => "PLANNING",
            SessionState::AwaitingPlanApproval => "AWAITING_PLAN_APPROVAL",
            SessionState::AwaitingUserFeedback => "AWAITING_USER_FEEDBACK",
            SessionState::InProgress => "IN_PROGRESS",
            SessionState::Paused => "PAUSED",
            SessionState::Failed => "FAILED",
            SessionState::Completed => "COMPLETED",
            SessionState::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a session's work is applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceContext {
    #[serde(default)]
    pub source: Option<String>,
}

/// A Jules session (subset of fields we care about).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Resource name, e.g. `sessions/1234567890`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: SessionState,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source_context: Option<SourceContext>,
}

impl Session {
    /// Numeric id: the last segment of `name`.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(self.name.as_str())
    }

    pub fn source(&self) -> Option<&str> {
        self.source_context.as_ref()?.source.as_deref()
    }
}

/// Response body of `GET /sessions`. Sessions that do not decode are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionsPage {
    #[serde(default, deserialize_with = "lenient_list")]
    pub sessions: Option<Vec<Session>>,
}

pub struct JulesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

impl JulesClient {
    pub fn new(base_url: &str, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jules-tools/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetch a single page of sessions. Sessions beyond `page_size` are not
    /// requested.
    pub async fn list_sessions(&self, page_size: u32) -> Result<SessionsPage> {
        let url = format!("{}/sessions", self.base_url);
        self.http
            .get(&url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .query(&[("pageSize", page_size.to_string())])
            .send()
            .await
            .context("Failed to send sessions request to Jules")?
            .error_for_status()
            .context("Jules sessions API returned error status")?
            .json::<SessionsPage>()
            .await
            .context("Failed to parse sessions response from Jules")
    }
}
