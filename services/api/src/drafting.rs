//! Chat-completions client used as the production [`MessageDrafter`].

use std::time::Duration;

use async_trait::async_trait;
use payment_followup::config::DraftingConfig;
use payment_followup::workflows::followup::drafting::{parse_message, SYSTEM_PROMPT};
use payment_followup::workflows::followup::{
    DraftingBundle, DraftingError, FollowupMessage, MessageDrafter,
};
use serde::{Deserialize, Serialize};
use tracing::info;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Drafter selected from configuration: a live client, or a stub that refuses every call.
pub(crate) enum ServiceDrafter {
    OpenAi(OpenAiDrafter),
    Disabled,
}

impl ServiceDrafter {
    pub(crate) fn from_config(config: &DraftingConfig) -> Self {
        match &config.api_key {
            Some(api_key) => Self::OpenAi(OpenAiDrafter::new(
                config.base_url.clone(),
                api_key.clone(),
                config.model.clone(),
                config.temperature,
            )),
            None => Self::Disabled,
        }
    }
}

#[async_trait]
impl MessageDrafter for ServiceDrafter {
    async fn draft(&self, bundle: &DraftingBundle) -> Result<FollowupMessage, DraftingError> {
        match self {
            Self::OpenAi(drafter) => drafter.draft(bundle).await,
            Self::Disabled => Err(DraftingError::Unavailable(
                "OPENAI_API_KEY is not configured".to_string(),
            )),
        }
    }
}

pub(crate) struct OpenAiDrafter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: Option<String>,
}

impl OpenAiDrafter {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub(crate) fn new(base_url: String, api_key: String, model: String, temperature: f32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            temperature,
        }
    }

    fn request<'a>(&'a self, user_prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait]
impl MessageDrafter for OpenAiDrafter {
    async fn draft(&self, bundle: &DraftingBundle) -> Result<FollowupMessage, DraftingError> {
        let url = format!("{}/chat/completions", self.base_url);
        let user_prompt = bundle.user_prompt()?;

        info!(
            url = %url,
            invoice_id = %bundle.invoice.invoice_id,
            model = %self.model,
            "requesting follow-up draft"
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&self.request(&user_prompt))
            .send()
            .await
            .map_err(|err| DraftingError::Transport(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), body));
        }

        let payload: ChatResponse = resp
            .json()
            .await
            .map_err(|err| DraftingError::Malformed(err.to_string()))?;
        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                DraftingError::Malformed("response contained no message content".to_string())
            })?;

        let message = parse_message(&content)?;
        info!(invoice_id = %bundle.invoice.invoice_id, "draft received");
        Ok(message)
    }
}

/// Rate limits and server faults are worth retrying; auth and request errors are not.
fn classify_status(status: u16, body: String) -> DraftingError {
    let detail = format!("server returned {status}: {body}");
    match status {
        408 | 429 | 500..=599 => DraftingError::Transport(detail),
        _ => DraftingError::Unavailable(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_followup::config::DraftingConfig;
    use payment_followup::workflows::followup::RetryPolicy;

    fn config(api_key: Option<&str>) -> DraftingConfig {
        DraftingConfig {
            api_key: api_key.map(str::to_string),
            base_url: "https://llm.internal/v1/".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn drafter_trims_trailing_slash() {
        let drafter = OpenAiDrafter::new(
            "https://llm.internal/v1/".into(),
            "key".into(),
            "gpt-4o-mini".into(),
            0.2,
        );
        assert_eq!(drafter.base_url, "https://llm.internal/v1");
    }

    #[test]
    fn request_carries_both_prompts_and_json_mode() {
        let drafter = OpenAiDrafter::new("http://localhost".into(), "key".into(), "m".into(), 0.2);
        let value = serde_json::to_value(drafter.request("draft this")).expect("serializes");
        assert_eq!(value["model"], "m");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "draft this");
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[test]
    fn status_classification_controls_retries() {
        assert!(classify_status(429, String::new()).is_retryable());
        assert!(classify_status(503, "busy".into()).is_retryable());
        let auth = classify_status(401, "bad key".into());
        assert!(!auth.is_retryable());
        assert!(auth.to_string().contains("server returned 401: bad key"));
    }

    #[test]
    fn missing_key_selects_disabled_drafter() {
        assert!(matches!(
            ServiceDrafter::from_config(&config(None)),
            ServiceDrafter::Disabled
        ));
        assert!(matches!(
            ServiceDrafter::from_config(&config(Some("sk-test"))),
            ServiceDrafter::OpenAi(_)
        ));
    }
}
