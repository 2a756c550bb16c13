use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use trustcheck_common::{Judgment, Result};

use crate::parser::parse_judgment;

/// Fixed instruction for the trust judgment. The reply template is what
/// [`parse_judgment`] looks for.
pub const TRUST_SYSTEM_PROMPT: &str = concat!(
    "You are a trustworthiness analyzer. Respond in this exact format:\n",
    "SCORE: [0-100 number]\n",
    "CATEGORY: [legitimate/clickbait/fake news/AI-generated/biased]\n",
    "REASON: [one sentence]",
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one system + user exchange and return the first choice's text.
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<LlmResponse>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    fn trust_system_prompt(&self) -> &str {
        TRUST_SYSTEM_PROMPT
    }

    /// Ask the model to rate `text` and parse its reply.
    ///
    /// Transport and service failures propagate; a reply that ignores the
    /// template still yields a [`Judgment`] built from per-field defaults.
    async fn assess_trust(&self, text: &str) -> Result<Judgment> {
        let prompt = format!("Rate trustworthiness of this text:\n\n{text}");

        tracing::debug!(
            model = self.model_name(),
            text_chars = text.chars().count(),
            "llm.judge.start"
        );
        let response = self
            .generate(&prompt, Some(self.trust_system_prompt()))
            .await?;
        tracing::debug!(reply = %response.text, "llm.judge.reply");

        let judgment = parse_judgment(&response.text);
        tracing::info!(
            score = judgment.score,
            category = %judgment.category,
            "llm.judge.parsed"
        );
        Ok(judgment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use trustcheck_common::CheckError;

    struct Scripted {
        reply: Result<String>,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl LlmClient for Scripted {
        async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<LlmResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), system_prompt.map(str::to_string)));
            match &self.reply {
                Ok(text) => Ok(LlmResponse {
                    text: text.clone(),
                    model: None,
                    tokens_used: None,
                }),
                Err(CheckError::EmptyReply) => Err(CheckError::EmptyReply),
                Err(e) => Err(CheckError::Judgment(e.to_string())),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn assess_trust_sends_fixed_instruction_and_parses() {
        let llm = Scripted {
            reply: Ok("SCORE: 73\nCATEGORY: biased\nREASON: Uses loaded language.".into()),
            seen: Mutex::new(Vec::new()),
        };
        let j = llm.assess_trust("Some headline").await.unwrap();
        assert_eq!(j, Judgment::new(73, "biased", "Uses loaded language."));

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[0].0, "Rate trustworthiness of this text:\n\nSome headline");
        assert_eq!(seen[0].1.as_deref(), Some(TRUST_SYSTEM_PROMPT));
    }

    #[tokio::test]
    async fn assess_trust_propagates_service_failure() {
        let llm = Scripted {
            reply: Err(CheckError::EmptyReply),
            seen: Mutex::new(Vec::new()),
        };
        let err = llm.assess_trust("x").await.unwrap_err();
        assert_eq!(err.to_string(), "API error");
    }
}
