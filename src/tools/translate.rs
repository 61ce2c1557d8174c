//! Translate tool - model-backed translation via Gemini generateContent

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use crate::config::require_key;
use crate::error::Error;
use crate::gateway::error_for_status;
use crate::Result;
use super::{ParamKind, ParamSpec, Tool, ToolArgs};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Top-level generateContent response
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
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
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate.content.as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

pub struct TranslateTool {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl TranslateTool {
    pub fn new(client: Client, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: GEMINI_API_BASE.to_string(),
            model: model.into(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[async_trait]
impl Tool for TranslateTool {
    fn name(&self) -> &str { "translate_response" }
    fn description(&self) -> &str { "Translate a piece of text into the requested language" }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("original_text", ParamKind::String, "Text to translate"),
            ParamSpec::required("lang", ParamKind::String, "Target language, e.g. \"French\""),
        ]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let api_key = require_key(&self.api_key, "GOOGLE_API_KEY")?;
        let text = args.str("original_text")?;
        let lang = args.str("lang")?;

        let request = json!({
            "contents": [{
                "parts": [{ "text": format!("Convert the following text in {}: {}", lang, text) }]
            }]
        });

        let response = self.client
            .post(self.build_url())
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;
        let generated: GenerateResponse = error_for_status(response).await?.json().await?;

        let translation = generated.text().ok_or_else(|| {
            let reason = generated.candidates.first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            Error::Remote { status: 200, detail: format!("Empty translation ({})", reason) }
        })?;

        Ok(json!({ "lang": lang, "translation": translation.trim() }))
    }
}
