//! HTTP-backed [`LocalLlmEvaluator`]/[`ReflectionEvaluator`] implementations.
//! Each talks to an OpenAI-compatible chat-completions endpoint: the local
//! stage asks for a trade idea, the reflection stage is handed the local
//! idea and asked to confirm, correct, or veto it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::KiError;
use crate::evaluator::{LocalLlmEvaluator, ReflectionEvaluator};
use crate::types::{LocalLlmResult, PromptInputs, ReflectionResult};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Extracts the first choice's message content from a chat-completions
/// response body, or maps a malformed body to a `KiError`.
fn extract_content(body: ChatResponse, stage: &'static str) -> Result<String, KiError> {
    body.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| match stage {
            "local" => KiError::LocalEvaluation("empty choices in LLM response".into()),
            _ => KiError::ReflectionEvaluation("empty choices in LLM response".into()),
        })
}

/// Calls an OpenAI-compatible `/chat/completions` endpoint for the local
/// (stage-1) trade-idea pass.
#[derive(Debug, Clone)]
pub struct HttpLocalLlmEvaluator {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpLocalLlmEvaluator {
    pub fn new(http: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self { http, endpoint: endpoint.into(), api_key, model: "local".to_string() }
    }

    fn request(&self, inputs: &PromptInputs) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: local_prompt(inputs) }],
            temperature: 0.2,
        }
    }
}

#[async_trait]
impl LocalLlmEvaluator for HttpLocalLlmEvaluator {
    async fn evaluate(&self, inputs: &PromptInputs) -> Result<LocalLlmResult, KiError> {
        let mut request = self.http.post(&self.endpoint).json(&self.request(inputs));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?.error_for_status()?;
        let body: ChatResponse = response.json().await?;
        let content = extract_content(body, "local")?;
        serde_json::from_str(&content)
            .map_err(|e| KiError::LocalEvaluation(format!("malformed JSON reply: {e}")))
    }
}

/// Calls an OpenAI-compatible `/chat/completions` endpoint for the
/// reflection (stage-2) confidence/correction pass.
#[derive(Debug, Clone)]
pub struct HttpReflectionEvaluator {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpReflectionEvaluator {
    pub fn new(http: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self { http, endpoint: endpoint.into(), api_key, model: "reflection".to_string() }
    }

    fn request(&self, inputs: &PromptInputs, local: &LocalLlmResult) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: reflection_prompt(inputs, local) }],
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl ReflectionEvaluator for HttpReflectionEvaluator {
    async fn evaluate(
        &self,
        inputs: &PromptInputs,
        local: &LocalLlmResult,
    ) -> Result<ReflectionResult, KiError> {
        let mut request = self.http.post(&self.endpoint).json(&self.request(inputs, local));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?.error_for_status()?;
        let body: ChatResponse = response.json().await?;
        let content = extract_content(body, "reflection")?;
        serde_json::from_str(&content)
            .map_err(|e| KiError::ReflectionEvaluation(format!("malformed JSON reply: {e}")))
    }
}

fn local_prompt(inputs: &PromptInputs) -> String {
    format!(
        "Evaluate a {} setup on {} during the {} session. Reference price {}, range [{:?}, {:?}], \
         account equity {}. Reply with JSON matching {{direction, stop_loss, take_profit, size, reason}}.",
        inputs.setup_kind,
        inputs.epic,
        inputs.phase,
        inputs.reference_price,
        inputs.range_low,
        inputs.range_high,
        inputs.account_equity,
    )
}

fn reflection_prompt(inputs: &PromptInputs, local: &LocalLlmResult) -> String {
    format!(
        "Review this trade idea for {}: direction {:?}, stop_loss {}, take_profit {}, size {}, reason: {}. \
         Reply with JSON matching {{corrections, confidence, reasoning}}; corrections may be null.",
        inputs.epic, local.direction, local.stop_loss, local.take_profit, local.size, local.reason,
    )
}
