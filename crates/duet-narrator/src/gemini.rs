//! Gemini narrator over the `generateContent` REST endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use duet_core::error::NarratorError;
use duet_core::narrator::Narrator;
use duet_core::turn::{PromptTurn, Role};

/// Default API root for key-authenticated requests.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Longest error body kept in a `NarratorError::Status`.
const ERROR_BODY_LIMIT: usize = 512;

/// Finish reasons that mean the candidate was withheld.
const BLOCKED_FINISH_REASONS: [&str; 4] = ["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT"];

/// Connection settings for one Gemini model.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-flash`.
    pub model: String,
}

/// A narrator backed by one Gemini model.
#[derive(Debug, Clone)]
pub struct GeminiNarrator {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiNarrator {
    /// Creates a narrator that shares `client` with other narrators.
    #[must_use]
    pub fn new(config: GeminiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Narrator => "model",
    }
}

fn build_request<'a>(system_prompt: &'a str, turns: &'a [PromptTurn]) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        system_instruction: SystemInstruction {
            parts: [TextPart {
                text: system_prompt,
            }],
        },
        contents: turns
            .iter()
            .map(|turn| Content {
                role: gemini_role(turn.role),
                parts: [TextPart { text: &turn.text }],
            })
            .collect(),
    }
}

/// Extracts the narration from a decoded response. An answer without text
/// parts is an empty narration, not a failure.
fn narration_from(response: GenerateContentResponse) -> Result<String, NarratorError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(NarratorError::MalformedResponse(format!(
            "prompt blocked: {reason}"
        )));
    }
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(NarratorError::MalformedResponse(
            "response contained no candidates".into(),
        ));
    };
    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|r| BLOCKED_FINISH_REASONS.contains(r))
    {
        return Err(NarratorError::MalformedResponse(format!(
            "candidate withheld: {reason}"
        )));
    }
    Ok(candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default())
}

fn truncate(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

#[async_trait]
impl Narrator for GeminiNarrator {
    fn name(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model, turns = turns.len()))]
    async fn generate(
        &self,
        system_prompt: &str,
        turns: &[PromptTurn],
    ) -> Result<String, NarratorError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&build_request(system_prompt, turns))
            .send()
            .await
            .map_err(|e| NarratorError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "gemini returned an error status");
            return Err(NarratorError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let decoded: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| NarratorError::MalformedResponse(e.to_string()))?;
        let text = narration_from(decoded)?;
        debug!(chars = text.len(), "gemini narration received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn narrator_for(server: &MockServer) -> GeminiNarrator {
        GeminiNarrator::new(
            GeminiConfig {
                base_url: server.uri(),
                api_key: "test-key".into(),
                model: "gemini-2.5-flash".into(),
            },
            reqwest::Client::new(),
        )
    }

    fn reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn test_build_request_maps_narrator_role_to_model() {
        let turns = vec![
            PromptTurn::narrator("The tavern is loud."),
            PromptTurn::user("I order an ale."),
        ];

        let json = serde_json::to_value(build_request("You are a DM.", &turns)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You are a DM.");
        assert_eq!(json["contents"][0]["role"], "model");
        assert_eq!(json["contents"][1]["role"], "user");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "I order an ale.");
    }

    #[tokio::test]
    async fn test_generate_returns_concatenated_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "I open the door." }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "The door " }, { "text": "groans open." }] }
                }]
            })))
            .mount(&server)
            .await;

        let text = narrator_for(&server)
            .generate("You are a DM.", &[PromptTurn::user("I open the door.")])
            .await
            .unwrap();

        assert_eq!(text, "The door groans open.");
    }

    #[tokio::test]
    async fn test_generate_treats_missing_parts_as_empty_narration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "finishReason": "STOP" }]
            })))
            .mount(&server)
            .await;

        let text = narrator_for(&server)
            .generate("prompt", &[PromptTurn::user("wait")])
            .await
            .unwrap();

        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_generate_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
            .mount(&server)
            .await;

        let err = narrator_for(&server)
            .generate("prompt", &[PromptTurn::user("attack")])
            .await
            .unwrap_err();

        match err {
            NarratorError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exhausted");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_response_without_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = narrator_for(&server)
            .generate("prompt", &[PromptTurn::user("look")])
            .await
            .unwrap_err();

        assert!(matches!(err, NarratorError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_generate_rejects_withheld_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let err = narrator_for(&server)
            .generate("prompt", &[PromptTurn::user("look")])
            .await
            .unwrap_err();

        match err {
            NarratorError::MalformedResponse(message) => assert!(message.contains("SAFETY")),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = narrator_for(&server)
            .generate("prompt", &[PromptTurn::user("look")])
            .await
            .unwrap_err();

        assert!(matches!(err, NarratorError::MalformedResponse(_)));
    }

    #[test]
    fn test_reply_fixture_decodes() {
        let decoded: GenerateContentResponse = serde_json::from_value(reply("Hi")).unwrap();
        assert_eq!(narration_from(decoded).unwrap(), "Hi");
    }
}
