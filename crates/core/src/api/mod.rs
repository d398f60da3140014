use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::{ApiConfig, AvatarError, Result};

/// Reply shown in the chat when the backend call fails.
pub const CHAT_ERROR_REPLY: &str = "Error generating response.";

const EMPTY_CHAT_REPLY: &str = "No response from API.";

/// A chat model advertised by the backend options endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    pub name: String,
    pub api_name: String,
}

/// Synthesized speech handed back to the embedder for decoding and playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechAudio {
    /// A URL the embedder can stream from.
    Url(String),
    /// Raw encoded audio returned inline.
    Bytes(Vec<u8>),
}

/// HTTP client for the assistant backend. Every public method absorbs
/// failure into a fallback value and logs a warning; callers never see an
/// error. A failed call surfaces as an error bubble or a silently skipped
/// speaking state.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Sends a user message with conversation context and returns the reply
    /// text. Falls back to [`CHAT_ERROR_REPLY`] on any failure.
    pub async fn send_chat_message(&self, message: &str, context: &str, model: &str) -> String {
        match self.request_chat(message, context, model).await {
            Ok(reply) if reply.is_empty() => EMPTY_CHAT_REPLY.to_string(),
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "chat request failed");
                CHAT_ERROR_REPLY.to_string()
            }
        }
    }

    /// Lists the chat models the backend offers. Falls back to an empty list.
    pub async fn available_models(&self) -> Vec<ModelOption> {
        match self.request_models().await {
            Ok(models) => models,
            Err(err) => {
                tracing::warn!(error = %err, "model listing failed");
                Vec::new()
            }
        }
    }

    /// Synthesizes speech for the reply text. `None` means the speaking state
    /// is skipped entirely.
    pub async fn text_to_speech(&self, text: &str, voice: &str, speed: f32) -> Option<SpeechAudio> {
        match self.request_speech(text, voice, speed).await {
            Ok(audio) => audio,
            Err(err) => {
                tracing::warn!(error = %err, "speech synthesis failed");
                None
            }
        }
    }

    /// Transcribes recorded speech. Falls back to an empty string, which the
    /// caller treats as "nothing was said".
    pub async fn speech_to_text(&self, audio: Vec<u8>, model: &str) -> String {
        match self.request_transcript(audio, model).await {
            Ok(transcript) => transcript,
            Err(err) => {
                tracing::warn!(error = %err, "transcription failed");
                String::new()
            }
        }
    }

    async fn request_chat(&self, message: &str, context: &str, model: &str) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            message: &'a str,
            context: &'a str,
        }

        let response = self
            .http
            .post(self.endpoint("/llm/"))
            .bearer_auth(&self.token)
            .json(&ChatRequest {
                model,
                message,
                context,
            })
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    async fn request_models(&self) -> Result<Vec<ModelOption>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct EndpointOption {
            name: String,
            api_name: String,
            endpoint_name: String,
        }

        let options: Vec<EndpointOption> = self
            .http
            .get(self.endpoint("/options/"))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(options
            .into_iter()
            .filter(|option| option.endpoint_name == "llm/")
            .map(|option| ModelOption {
                name: option.name,
                api_name: option.api_name,
            })
            .collect())
    }

    async fn request_speech(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> Result<Option<SpeechAudio>> {
        let encoded = BASE64.encode(text.as_bytes());
        let response = self
            .http
            .get(self.endpoint("/tts/"))
            .bearer_auth(&self.token)
            .header("model", voice)
            .header("message", encoded)
            .header("speed", speed.to_string())
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.bytes().await?;

        // JSON bodies reference the audio indirectly; anything else is the
        // encoded audio itself.
        if content_type.starts_with("application/json") {
            #[derive(Deserialize)]
            #[serde(rename_all = "camelCase")]
            struct SpeechPayload {
                #[serde(default)]
                audio_url: Option<String>,
                #[serde(default)]
                audio_base64: Option<String>,
            }

            let payload: SpeechPayload = serde_json::from_slice(&body)
                .map_err(|err| AvatarError::msg(format!("malformed speech payload: {err}")))?;

            if let Some(url) = payload.audio_url.filter(|url| !url.is_empty()) {
                return Ok(Some(SpeechAudio::Url(url)));
            }
            if let Some(encoded) = payload.audio_base64.filter(|audio| !audio.is_empty()) {
                let bytes = BASE64.decode(encoded.as_bytes()).map_err(|err| {
                    AvatarError::msg(format!("malformed inline speech audio: {err}"))
                })?;
                return Ok(Some(SpeechAudio::Bytes(bytes)));
            }
            return Ok(None);
        }

        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(SpeechAudio::Bytes(body.to_vec())))
    }

    async fn request_transcript(&self, audio: Vec<u8>, model: &str) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name("speech.webm")
            .mime_str("audio/webm")?;
        let form = reqwest::multipart::Form::new()
            .text("model", model.to_string())
            .part("message", part);

        let response = self
            .http
            .post(self.endpoint("/stt/"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
