use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::{Error, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const STREAM_CHANNEL_CAPACITY: usize = 32;
/// Longest `text/event-stream` line accepted before the stream is abandoned.
pub const MAX_SSE_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Lightweight Gemini REST client.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    /// Construct a Gemini client.
    ///
    /// `model` should be the bare model ID (for example `gemini-pro`),
    /// not a `models/...`-prefixed path segment.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, model, timeout, Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Returns the configured model ID without the `models/` prefix.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send<Req: Serialize>(&self, url: String, request: &Req) -> Result<Response> {
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Gemini API error (status {}): {}", status, error_text);
            return Err(Error::AiProvider(format!(
                "Gemini API error (status {}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    async fn post_to_url<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        url: String,
        request: &Req,
    ) -> Result<Resp> {
        let body = self.send(url, request).await?.text().await?;
        parse_response(&body)
    }

    /// Calls Gemini's `generateContent` endpoint.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        self.post_to_url(url, request).await
    }

    /// Calls Gemini's `streamGenerateContent` endpoint with server-sent events.
    ///
    /// HTTP-level failures are returned directly. Once the stream is open,
    /// each event arrives on the returned channel; a transport or parse error
    /// is sent as the final item.
    pub async fn stream_generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<mpsc::Receiver<Result<GenerateContentResponse>>> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        let response = self.send(url, request).await?;
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        tokio::spawn(pump_events(response, tx));

        Ok(rx)
    }
}

async fn pump_events(
    mut response: Response,
    tx: mpsc::Sender<Result<GenerateContentResponse>>,
) {
    let mut decoder = SseDecoder::default();

    loop {
        let payloads = match response.chunk().await {
            Ok(Some(bytes)) => decoder.push(&bytes),
            Ok(None) => Ok(decoder.finish()),
            Err(e) => Err(e.into()),
        };
        let payloads = match payloads {
            Ok(payloads) => payloads,
            Err(e) => {
                tracing::error!("Gemini stream interrupted: {}", e);
                let _ = tx.send(Err(e)).await;
                return;
            }
        };
        let done = decoder.is_finished();

        for payload in payloads {
            let event = parse_response::<GenerateContentResponse>(&payload);
            let failed = event.is_err();
            if tx.send(event).await.is_err() {
                tracing::debug!("Gemini stream receiver dropped");
                return;
            }
            if failed {
                return;
            }
        }

        if done {
            return;
        }
    }
}

fn parse_response<Resp: DeserializeOwned>(body: &str) -> Result<Resp> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
        Error::AiProvider(format!("Failed to parse Gemini response: {}", e))
    })
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Only `data:` fields are kept; consecutive `data:` lines of one event are
/// joined with `\n`. Bytes are buffered until a full line is available, so
/// chunk boundaries may fall anywhere, including inside a UTF-8 sequence.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline.
    scanned: usize,
    max_line_bytes: usize,
    data: Vec<String>,
    finished: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line_bytes(MAX_SSE_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line_bytes,
            data: Vec::new(),
            finished: false,
        }
    }

    /// Feed a chunk; returns the payloads of every event it completed.
    ///
    /// Fails once a single line grows past the configured limit. The decoder
    /// is finished after an error.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            self.check_line_len(end - start)?;

            let mut line = &self.buffer[start..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line).into_owned();
            self.process_line(&line, &mut events);

            start = end + 1;
            self.scanned = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        self.check_line_len(self.buffer.len())?;

        Ok(events)
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            self.process_line(line.trim_end_matches('\r'), &mut events);
        }
        self.scanned = 0;
        self.dispatch(&mut events);
        self.finished = true;
        events
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn check_line_len(&mut self, len: usize) -> Result<()> {
        if len <= self.max_line_bytes {
            return Ok(());
        }
        self.buffer.clear();
        self.scanned = 0;
        self.data.clear();
        self.finished = true;
        Err(Error::AiProvider(format!(
            "event stream line exceeds {} bytes",
            self.max_line_bytes
        )))
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            self.dispatch(events);
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
    }
}
