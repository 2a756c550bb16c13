use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trustcheck_common::{CheckError, Result};
use trustcheck_http::{Auth, HttpClient, HttpError, RequestOpts};

pub const ASI_ONE_CHAT_URL: &str = "https://api.asi1.ai/v1/chat/completions";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Client for the ASI:One OpenAI-compatible chat completions endpoint.
///
/// A missing credential is not an error at construction time: every call
/// then fails, which turns every analysis into `success: false`.
pub struct AsiOneClient {
    client: HttpClient,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl AsiOneClient {
    /// Create a client for `endpoint` (the full chat-completions URL).
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: String,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        let client = HttpClient::new(&endpoint)
            .map_err(|e| CheckError::Config(format!("HttpClient init failed: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LlmClient for AsiOneClient {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<LlmResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            tracing::warn!("llm.asi.missing_credential");
            CheckError::Judgment("LLM API key is not configured".into())
        })?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system".into(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".into(),
            content: prompt.to_string(),
        });

        let req = ChatRequest {
            model: &self.model,
            messages,
        };

        let resp: ChatResponse = self
            .client
            .post_json_opts(
                &self.endpoint,
                &req,
                RequestOpts {
                    timeout: Some(self.timeout),
                    auth: Some(Auth::Bearer(api_key)),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(http_to_check)?;

        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| {
                tracing::warn!(model = %self.model, "llm.asi.empty_choices");
                CheckError::EmptyReply
            })?;

        Ok(LlmResponse {
            text,
            model: resp.model,
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn http_to_check(e: HttpError) -> CheckError {
    CheckError::Judgment(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TRUST_SYSTEM_PROMPT;
    use serde_json::json;
    use trustcheck_common::Judgment;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, key: Option<&str>) -> AsiOneClient {
        AsiOneClient::new(
            format!("{}/v1/chat/completions", server.uri()),
            key.map(str::to_string),
            "asi1-mini".into(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sends_openai_shaped_request_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "asi1-mini",
                "messages": [
                    {"role": "system", "content": TRUST_SYSTEM_PROMPT},
                    {"role": "user", "content": "Rate trustworthiness of this text:\n\nhello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "asi1-mini",
                "choices": [
                    {"message": {
                        "role": "assistant",
                        "content": "SCORE: 91\nCATEGORY: legitimate\nREASON: Neutral tone."
                    }},
                    {"message": {"role": "assistant", "content": "SCORE: 5"}}
                ],
                "usage": {"total_tokens": 42}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let judgment = client.assess_trust("hello").await.unwrap();
        assert_eq!(judgment, Judgment::new(91, "legitimate", "Neutral tone."));
    }

    #[tokio::test]
    async fn empty_choices_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k")).generate("x", None).await.unwrap_err();
        assert!(matches!(err, CheckError::EmptyReply));
        assert_eq!(err.to_string(), "API error");
    }

    #[tokio::test]
    async fn non_success_status_reports_underlying_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": {"message": "Invalid API key"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, Some("bad")).generate("x", None).await.unwrap_err();
        let reason = err.to_string();
        assert!(reason.contains("401"), "{reason}");
        assert!(reason.contains("Invalid API key"), "{reason}");
    }

    #[tokio::test]
    async fn slow_reply_times_out_as_judgment_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": [{"message": {"content": "SCORE: 90"}}]}))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("k")).with_timeout(Duration::from_millis(50));
        let err = client.assess_trust("x").await.unwrap_err();
        match err {
            CheckError::Judgment(msg) => assert!(msg.starts_with("network error"), "{msg}"),
            other => panic!("expected judgment failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_credential_fails_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, Some("  ")).generate("x", None).await.unwrap_err();
        assert!(matches!(err, CheckError::Judgment(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k")).generate("x", None).await.unwrap_err();
        assert!(err.to_string().starts_with("decode error"));
    }
}
