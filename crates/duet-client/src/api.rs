//! Typed client for the sessions HTTP API.

use duet_session::domain::character::{Attributes, Character};
use duet_session::domain::snapshot::SessionSnapshot;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::ClientError;

/// Header carrying the authenticated user id.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Body of a create-session request.
#[derive(Debug, Clone, Serialize)]
pub struct NewSession {
    /// Who the player is.
    pub character: Character,
    /// Attribute allocation.
    pub attributes: Attributes,
    /// Adventure context.
    pub prologue: String,
}

#[derive(Debug, Serialize)]
struct ActionBody<'a> {
    action: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Calls `/api/v1/sessions` on behalf of one user.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    owner_id: Uuid,
    client: reqwest::Client,
}

impl ApiClient {
    /// Creates a client for the server at `base_url` (scheme, host and port).
    #[must_use]
    pub fn new(base_url: impl Into<String>, owner_id: Uuid, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            owner_id,
            client,
        }
    }

    /// The user this client acts for.
    #[must_use]
    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/sessions{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .header(OWNER_HEADER, self.owner_id.to_string())
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(api_error(response).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        Ok(self.send(request).await?.json().await?)
    }

    /// Lists the user's sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport failure or an error response.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSnapshot>, ClientError> {
        self.send_json(self.client.get(self.url(""))).await
    }

    /// Creates a session and returns it with both opening narrations.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport failure or an error response.
    #[instrument(skip_all)]
    pub async fn create_session(&self, new: &NewSession) -> Result<SessionSnapshot, ClientError> {
        self.send_json(self.client.post(self.url("")).json(new)).await
    }

    /// Loads one session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport failure or an error response.
    pub async fn get_session(&self, session_id: Uuid) -> Result<SessionSnapshot, ClientError> {
        self.send_json(self.client.get(self.url(&format!("/{session_id}"))))
            .await
    }

    /// Plays one action and returns the updated session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport failure or an error response.
    #[instrument(skip(self, action), fields(%session_id))]
    pub async fn send_action(
        &self,
        session_id: Uuid,
        action: &str,
    ) -> Result<SessionSnapshot, ClientError> {
        let request = self
            .client
            .post(self.url(&format!("/{session_id}/actions")))
            .json(&ActionBody { action });
        self.send_json(request).await
    }

    /// Deletes a session and its history.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport failure or an error response.
    pub async fn delete_session(&self, session_id: Uuid) -> Result<(), ClientError> {
        self.send(self.client.delete(self.url(&format!("/{session_id}"))))
            .await?;
        Ok(())
    }
}

async fn api_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "api returned an error status");
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => ClientError::Api {
            status: status.as_u16(),
            code: parsed.error,
            message: parsed.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: "unknown".to_owned(),
            message: fallback_message(status, &body),
        },
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        status.to_string()
    } else {
        body.chars().take(200).collect()
    }
}
