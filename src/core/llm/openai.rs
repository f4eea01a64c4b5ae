//! OpenAI chat completions script writer
//!
//! # API Reference
//!
//! - Endpoint: `POST {base_url}/chat/completions`
//! - Auth: `Authorization: Bearer <key>`
//! - Critique uses `response_format: {"type": "json_object"}`

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::prompt::{
    clean_script, critique_system_prompt, critique_user_prompt, generation_system_prompt,
    generation_user_prompt,
};
use super::{
    Critique, CritiqueRequest, LlmError, LlmResult, ScriptDraft, ScriptRequest, ScriptWriter,
};

const GENERATION_TEMPERATURE: f32 = 0.8;
const CRITIQUE_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Critique JSON as models actually return it; scores sometimes arrive as floats or strings
#[derive(Debug, Deserialize)]
struct RawCritique {
    score: Value,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default, rename = "revisedScript", alias = "revised_script")]
    revised_script: Option<String>,
}

/// Script writer backed by an OpenAI-compatible chat completions API
#[derive(Clone)]
pub struct OpenAiScriptWriter {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for OpenAiScriptWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiScriptWriter")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiScriptWriter {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, body: Value) -> LlmResult<(String, String)> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            tracing::warn!(status = status.as_u16(), "Chat completion failed");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        Ok((content, completion.model.unwrap_or_else(|| self.model.clone())))
    }
}

#[async_trait]
impl ScriptWriter for OpenAiScriptWriter {
    async fn generate_script(&self, request: &ScriptRequest) -> LlmResult<ScriptDraft> {
        let body = json!({
            "model": self.model,
            "temperature": GENERATION_TEMPERATURE,
            "messages": [
                {"role": "system", "content": generation_system_prompt()},
                {"role": "user", "content": generation_user_prompt(request)},
            ],
        });

        let (content, model) = self.complete(body).await?;
        let script = clean_script(&content);
        if script.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        tracing::debug!(model = %model, words = script.split_whitespace().count(), "Generated script");
        Ok(ScriptDraft { script, model })
    }

    async fn critique_script(&self, request: &CritiqueRequest) -> LlmResult<Critique> {
        let body = json!({
            "model": self.model,
            "temperature": CRITIQUE_TEMPERATURE,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": critique_system_prompt()},
                {"role": "user", "content": critique_user_prompt(request)},
            ],
        });

        let (content, _) = self.complete(body).await?;
        parse_critique(&content)
    }
}

fn parse_critique(content: &str) -> LlmResult<Critique> {
    let raw: RawCritique = serde_json::from_str(content.trim())
        .map_err(|e| LlmError::InvalidResponse(format!("critique is not valid JSON: {e}")))?;

    let score = match &raw.score {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| LlmError::InvalidResponse("critique score is not a number".to_string()))?;

    Ok(Critique {
        score: score.round().clamp(1.0, 10.0) as u8,
        strengths: raw.strengths,
        suggestions: raw.suggestions,
        revised_script: raw
            .revised_script
            .map(|s| clean_script(&s))
            .filter(|s| !s.is_empty()),
    })
}
