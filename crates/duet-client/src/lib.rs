//! Duet — client side.
//!
//! [`ApiClient`] speaks the sessions HTTP API; [`OptimisticSession`] keeps a
//! displayed session responsive while an action is in flight.
//! [`submit_action`] ties the two together.

pub mod api;
pub mod error;
pub mod optimistic;

pub use api::{ApiClient, NewSession};
pub use error::ClientError;
pub use optimistic::{OptimisticSession, Reconciliation, SubmissionTicket};

/// Plays `action` against the server with an optimistic local echo.
///
/// On success the displayed session is the server's snapshot. On any failure
/// it is exactly what it was before the call, and the error is also recorded
/// in `session.last_error()`.
///
/// # Errors
///
/// Returns `ClientError::SubmissionInFlight` or `ClientError::Validation`
/// without sending anything, and the transport or API error otherwise.
pub async fn submit_action(
    api: &ApiClient,
    session: &mut OptimisticSession,
    action: &str,
) -> Result<(), ClientError> {
    let ticket = session.submit(action)?;
    let session_id = session.displayed().id;
    match api.send_action(session_id, action).await {
        Ok(snapshot) => session.confirm(ticket, snapshot).map(|_| ()),
        Err(err) => {
            session.fail(ticket, &err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use duet_core::turn::PromptTurn;
    use duet_session::domain::character::{Attributes, Character, CharacterClass, CharacterRace};
    use duet_session::domain::snapshot::SessionSnapshot;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn snapshot(owner_id: Uuid) -> SessionSnapshot {
        SessionSnapshot {
            id: Uuid::new_v4(),
            owner_id,
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            character: Character {
                name: "Minthara".into(),
                class: CharacterClass::Cleric,
                race: CharacterRace::Elf,
            },
            attributes: Attributes::default(),
            prologue: "Moonrise Towers.".into(),
            thread_a: vec![PromptTurn::narrator("A: torches gutter")],
            thread_b: vec![PromptTurn::narrator("B: torches gutter")],
        }
    }

    #[tokio::test]
    async fn test_submit_action_commits_server_snapshot() {
        // Arrange
        let server = MockServer::start().await;
        let owner_id = Uuid::new_v4();
        let original = snapshot(owner_id);
        let mut answered = original.clone();
        for thread in [&mut answered.thread_a, &mut answered.thread_b] {
            thread.push(PromptTurn::user("I pray"));
            thread.push(PromptTurn::narrator("Silence answers."));
        }
        Mock::given(method("POST"))
            .and(path(format!("/api/v1/sessions/{}/actions", original.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(&answered))
            .mount(&server)
            .await;
        let api = ApiClient::new(server.uri(), owner_id, reqwest::Client::new());
        let mut session = OptimisticSession::new(original);

        // Act
        submit_action(&api, &mut session, "I pray").await.unwrap();

        // Assert
        assert_eq!(session.displayed(), &answered);
        assert!(session.can_submit());
    }

    #[tokio::test]
    async fn test_submit_action_rolls_back_on_server_error() {
        // Arrange
        let server = MockServer::start().await;
        let owner_id = Uuid::new_v4();
        let original = snapshot(owner_id);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_json(serde_json::json!({
                "error": "generation_failed",
                "message": "narrator for thread a failed"
            })))
            .mount(&server)
            .await;
        let api = ApiClient::new(server.uri(), owner_id, reqwest::Client::new());
        let mut session = OptimisticSession::new(original.clone());

        // Act
        let result = submit_action(&api, &mut session, "I pray").await;

        // Assert
        assert!(matches!(result, Err(ClientError::Api { status: 502, .. })));
        assert_eq!(session.displayed(), &original);
        assert_eq!(session.last_error(), Some("narrator for thread a failed"));
        assert!(session.can_submit());
    }
}
