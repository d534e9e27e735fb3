//! Pending-session listing for the current repository.

use anyhow::Result;

use crate::api::{JulesClient, Session, SessionState};
use crate::config::SESSION_PAGE_SIZE;
use crate::source::RepositorySource;

/// States in which a session is waiting on a human.
pub const ACTIONABLE_STATES: [SessionState; 2] =
    [SessionState::AwaitingPlanApproval, SessionState::Completed];

/// Width the state column is padded to.
const STATE_COLUMN_WIDTH: usize = 25;

/// Sessions for `source` that are in an actionable state, in service order.
pub fn pending_sessions<'a>(
    sessions: &'a [Session],
    source: &RepositorySource,
) -> impl Iterator<Item = &'a Session> {
    sessions.iter().filter(move |s| {
        s.source() == Some(source.as_str()) && ACTIONABLE_STATES.contains(&s.state)
    })
}

/// `[<id>] <STATE padded to 25> | <title>`
pub fn format_session_line(session: &Session) -> String {
    format!(
        "[{}] {:<width$} | {}",
        session.id(),
        session.state.as_str(),
        session.title,
        width = STATE_COLUMN_WIDTH
    )
}

/// Fetch one page of sessions and return the formatted lines for those
/// pending on `source`.
///
/// A response without a `sessions` collection yields no lines.
pub async fn list_pending_sessions(
    client: &JulesClient,
    source: &RepositorySource,
) -> Result<Vec<String>> {
    let page = client.list_sessions(SESSION_PAGE_SIZE).await?;
    let Some(sessions) = page.sessions else {
        tracing::debug!("sessions response had no sessions collection");
        return Ok(Vec::new());
    };
    tracing::debug!(total = sessions.len(), %source, "filtering sessions");

    Ok(pending_sessions(&sessions, source)
        .map(format_session_line)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(id: u64, state: &str, source: &str, title: &str) -> Session {
        serde_json::from_value(json!({
            "name": format!("sessions/{}", id),
            "state": state,
            "title": title,
            "sourceContext": {"source": source}
        }))
        .unwrap()
    }

    fn widgets() -> RepositorySource {
        RepositorySource::from_remote_url("git@github.com:acme/widgets.git").unwrap()
    }

    #[test]
    fn test_pending_sessions_filters_state_and_source() {
        let sessions = vec![
            session(1, "COMPLETED", "sources/github/acme/widgets", "one"),
            session(2, "IN_PROGRESS", "sources/github/acme/widgets", "two"),
            session(3, "COMPLETED", "sources/github/acme/gadgets", "three"),
            session(4, "AWAITING_PLAN_APPROVAL", "sources/github/acme/widgets", "four"),
            session(5, "FAILED", "sources/github/acme/widgets", "five"),
        ];

        let ids: Vec<&str> = pending_sessions(&sessions, &widgets())
            .map(Session::id)
            .collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_pending_sessions_preserves_service_order() {
        let sessions = vec![
            session(9, "AWAITING_PLAN_APPROVAL", "sources/github/acme/widgets", "later"),
            session(3, "COMPLETED", "sources/github/acme/widgets", "earlier"),
        ];

        let ids: Vec<&str> = pending_sessions(&sessions, &widgets())
            .map(Session::id)
            .collect();
        assert_eq!(ids, vec!["9", "3"]);
    }

    #[test]
    fn test_pending_sessions_skips_missing_source_context() {
        let sessions: Vec<Session> = vec![
            serde_json::from_value(json!({"name": "sessions/1", "state": "COMPLETED"})).unwrap(),
        ];
        assert_eq!(pending_sessions(&sessions, &widgets()).count(), 0);
    }

    #[test]
    fn test_format_session_line_pads_state() {
        let s = session(42, "COMPLETED", "sources/github/acme/widgets", "Fix login bug");
        assert_eq!(
            format_session_line(&s),
            "[42] COMPLETED                 | Fix login bug"
        );
    }

    #[test]
    fn test_format_session_line_long_state() {
        let s = session(7, "AWAITING_PLAN_APPROVAL", "sources/github/acme/widgets", "Plan");
        let line = format_session_line(&s);
        assert_eq!(line, "[7] AWAITING_PLAN_APPROVAL    | Plan");
    }
}
