use crate::error::{classify_http_error, ProviderError};
use crate::gateway::{ChatRequest, GenerativeBackend};
use crate::sse::{SseEvent, SseParser};
use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::agent_api::StreamChunk;
use shared::media::{AspectRatio, InlineImage};
use shared::settings::{GeminiSettings, ProviderAuth};
use std::env;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use zeroize::Zeroizing;

const IMAGE_OUTPUT_MIME: &str = "image/jpeg";

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize)]
struct RequestContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: AspectRatio,
    output_mime_type: &'static str,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<Blob>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

// ── Shaping and unwrapping ───────────────────────────────────────────

fn text_content(role: Option<&'static str>, text: impl Into<String>) -> RequestContent {
    RequestContent {
        role,
        parts: vec![RequestPart::Text { text: text.into() }],
    }
}

fn build_chat_request(request: ChatRequest) -> GenerateContentRequest {
    let mut contents: Vec<RequestContent> = request
        .history
        .into_iter()
        .map(|turn| text_content(Some(turn.role.as_str()), turn.text))
        .collect();
    contents.push(text_content(Some("user"), request.message));

    let system_instruction = if request.system_instruction.trim().is_empty() {
        None
    } else {
        Some(text_content(None, request.system_instruction))
    };

    GenerateContentRequest {
        contents,
        system_instruction,
        generation_config: None,
    }
}

fn build_edit_request(image: &InlineImage, prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![RequestContent {
            role: Some("user"),
            parts: vec![
                RequestPart::InlineData {
                    inline_data: Blob {
                        mime_type: image.mime_type.clone(),
                        data: image.to_base64(),
                    },
                },
                RequestPart::Text {
                    text: prompt.to_string(),
                },
            ],
        }],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["IMAGE", "TEXT"],
        }),
    }
}

/// Concatenated text of the first candidate.
fn candidate_text(resp: &GenerateContentResponse) -> String {
    resp.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|c| {
            c.parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// First inline image of the first candidate.
fn candidate_image(resp: GenerateContentResponse) -> Result<Option<InlineImage>, ProviderError> {
    let blob = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.inline_data));
    match blob {
        Some(blob) => {
            let bytes = BASE64_STANDARD.decode(blob.data.trim())?;
            Ok(Some(InlineImage::new(blob.mime_type, bytes)))
        }
        None => Ok(None),
    }
}

fn prediction_image(resp: PredictResponse) -> Result<Option<InlineImage>, ProviderError> {
    let Some(prediction) = resp.predictions.into_iter().next() else {
        return Ok(None);
    };
    match prediction.bytes_base64_encoded {
        Some(data) if !data.trim().is_empty() => {
            let bytes = BASE64_STANDARD.decode(data.trim())?;
            let mime = prediction
                .mime_type
                .unwrap_or_else(|| IMAGE_OUTPUT_MIME.to_string());
            Ok(Some(InlineImage::new(mime, bytes)))
        }
        _ => Ok(None),
    }
}

/// Resolve the API key: settings first, then `GEMINI_API_KEY`, then `API_KEY`.
pub fn resolve_api_key(auth: &ProviderAuth) -> Result<Zeroizing<String>, ProviderError> {
    resolve_with(auth, |var| env::var(var).ok())
}

fn resolve_with(
    auth: &ProviderAuth,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Zeroizing<String>, ProviderError> {
    if let Some(key) = auth.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        return Ok(Zeroizing::new(key.trim().to_string()));
    }
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|var| lookup(*var))
        .find(|k| !k.trim().is_empty())
        .map(|k| Zeroizing::new(k.trim().to_string()))
        .ok_or(ProviderError::MissingCredential)
}

// ── Client ───────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self> {
        Ok(Self {
            http: Client::builder()
                .timeout(Duration::from_secs(settings.request_timeout_secs))
                .pool_max_idle_per_host(2)
                .build()?,
            settings,
        })
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.settings.api_base.trim_end_matches('/'),
            model,
            method
        )
    }

    /// POST a JSON body with the key resolved at call time.
    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response, ProviderError> {
        let key = resolve_api_key(&self.settings.auth)?;
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", key.as_str())
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }
        Ok(resp)
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let text = self.post(url, body).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Forward one SSE event; returns false once the stream should stop.
    fn forward_event(event: &SseEvent, tx: &UnboundedSender<StreamChunk>) -> bool {
        match serde_json::from_str::<GenerateContentResponse>(&event.data) {
            Ok(resp) => {
                let text = candidate_text(&resp);
                if !text.is_empty() {
                    let _ = tx.send(StreamChunk::Text(text));
                }
                true
            }
            Err(e) => {
                let _ = tx.send(StreamChunk::Error(format!(
                    "Failed to parse Gemini stream: {}",
                    e
                )));
                false
            }
        }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        let url = format!(
            "{}?alt=sse",
            self.url(&self.settings.chat_model, "streamGenerateContent")
        );
        let body = build_chat_request(request);
        let resp = self.post(&url, &body).await?;

        let mut parser = SseParser::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {}", e)));
                    return Ok(());
                }
            };
            for event in parser.feed(&bytes) {
                if !Self::forward_event(&event, &tx) {
                    return Ok(());
                }
            }
        }
        if let Some(event) = parser.finish() {
            if !Self::forward_event(&event, &tx) {
                return Ok(());
            }
        }

        let _ = tx.send(StreamChunk::Done);
        Ok(())
    }

    async fn edit_image(
        &self,
        image: &InlineImage,
        prompt: &str,
    ) -> Result<Option<InlineImage>, ProviderError> {
        let url = self.url(&self.settings.image_edit_model, "generateContent");
        tracing::debug!(mime = %image.mime_type, bytes = image.bytes.len(), "submitting image edit");
        let body = build_edit_request(image, prompt);
        let resp: GenerateContentResponse = self.post_json(&url, &body).await?;
        candidate_image(resp)
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<InlineImage>, ProviderError> {
        let url = self.url(&self.settings.image_model, "predict");
        tracing::debug!(%aspect_ratio, "submitting image generation");
        let body = PredictRequest {
            instances: vec![PredictInstance { prompt }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio,
                output_mime_type: IMAGE_OUTPUT_MIME,
            },
        };
        let resp: PredictResponse = self.post_json(&url, &body).await?;
        prediction_image(resp)
    }
}
