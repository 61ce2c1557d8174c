//! Speech tool - text to speech via ElevenLabs, saved as an audio file

use std::path::PathBuf;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use crate::config::{require_key, SpeechConfig};
use crate::gateway::error_for_status;
use crate::Result;
use super::{ParamKind, ParamSpec, Tool, ToolArgs};

pub const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io";

pub struct SpeechTool {
    client: Client,
    base_url: String,
    settings: SpeechConfig,
    api_key: Option<String>,
}

impl SpeechTool {
    pub fn new(client: Client, settings: SpeechConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: ELEVENLABS_API_BASE.to_string(),
            settings,
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// File extension implied by an output format such as `mp3_44100_128`
    fn extension(&self) -> &str {
        self.settings.output_format.split('_').next().filter(|s| !s.is_empty()).unwrap_or("mp3")
    }

    fn output_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
        self.settings.output_dir.join(format!("speech-{}.{}", stamp, self.extension()))
    }
}

#[async_trait]
impl Tool for SpeechTool {
    fn name(&self) -> &str { "get_voice_response" }
    fn description(&self) -> &str {
        "Synthesize speech for the given text and save it as an audio file"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("text", ParamKind::String, "Text to speak")]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let api_key = require_key(&self.api_key, "ELEVENLABS_API_KEY")?;
        let text = args.str("text")?;

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            self.settings.voice_id
        );
        let response = self.client
            .post(url)
            .query(&[("output_format", self.settings.output_format.as_str())])
            .header("xi-api-key", api_key)
            .json(&json!({
                "text": text,
                "model_id": self.settings.model_id,
            }))
            .send()
            .await?;
        let audio = error_for_status(response).await?.bytes().await?;

        tokio::fs::create_dir_all(&self.settings.output_dir).await?;
        let path = self.output_path();
        tokio::fs::write(&path, &audio).await?;
        tracing::info!("Wrote {} bytes of audio to {:?}", audio.len(), path);

        Ok(json!({
            "path": path.display().to_string(),
            "bytes": audio.len(),
        }))
    }
}
