use super::client::GeminiHttpClient;
use super::types::{
    Content, FinishReason, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    InlineData, Part,
};
use crate::ai::{mime, ContentGenerator, TextStream};
use crate::models::AiModel;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;
use tokio::sync::mpsc;

const STREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// Streams text from Gemini, switching to the vision model when images are attached.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: AiModel,
    base_url: Option<String>,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: AiModel) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: AiModel, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn model(&self) -> AiModel {
        self.model
    }

    /// Model that will serve a prompt with `image_count` images.
    pub fn model_for(&self, image_count: usize) -> AiModel {
        if image_count > 0 && !self.model.supports_images() {
            AiModel::GeminiProVision
        } else {
            self.model
        }
    }

    fn http_for(&self, model: AiModel) -> GeminiHttpClient {
        let http = GeminiHttpClient::new_with_client(
            self.api_key.clone(),
            model.to_string(),
            STREAM_TIMEOUT,
            self.client.clone(),
        );
        match &self.base_url {
            Some(base_url) => http.with_base_url(base_url.clone()),
            None => http,
        }
    }

    fn build_request(model: AiModel, prompt: &str, images: &[Vec<u8>]) -> GenerateContentRequest {
        let mut parts: Vec<Part> = images
            .iter()
            .map(|image| Part::InlineData {
                inline_data: InlineData {
                    mime_type: mime::detect_image_mime(image).to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(image),
                },
            })
            .collect();
        parts.push(Part::Text {
            text: prompt.to_string(),
        });

        GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config: model.max_tokens().map(|max| GenerationConfig {
                max_output_tokens: Some(max),
                ..Default::default()
            }),
            safety_settings: Vec::new(),
        }
    }
}

/// Text carried by one streamed event, or the reason the prompt was blocked.
fn event_text(event: &GenerateContentResponse) -> Result<Option<String>> {
    if let Some(reason) = event
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(Error::AiProvider(format!("prompt was blocked: {}", reason)));
    }

    if let Some(reason) = event.candidates.first().and_then(|c| c.finish_reason) {
        if !matches!(reason, FinishReason::Stop | FinishReason::Unspecified) {
            tracing::warn!("Gemini stopped generating early: {}", reason);
        }
    }

    Ok(event.text())
}

async fn forward_text(
    mut events: mpsc::Receiver<Result<GenerateContentResponse>>,
    tx: mpsc::Sender<Result<String>>,
) {
    while let Some(event) = events.recv().await {
        let chunk = match event.and_then(|event| event_text(&event)) {
            Ok(Some(text)) => Ok(text),
            Ok(None) => continue,
            Err(e) => Err(e),
        };
        let failed = chunk.is_err();
        if tx.send(chunk).await.is_err() || failed {
            return;
        }
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate_stream(&self, prompt: &str, images: &[Vec<u8>]) -> Result<TextStream> {
        let model = self.model_for(images.len());
        tracing::debug!(
            "Streaming from {} ({} image(s), {} prompt bytes)",
            model,
            images.len(),
            prompt.len()
        );

        let request = Self::build_request(model, prompt, images);
        let events = self.http_for(model).stream_generate_content(&request).await?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(forward_text(events, tx));
        Ok(rx)
    }
}
