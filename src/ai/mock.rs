use super::{ContentGenerator, TextStream};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Scripted generator: replays fixed chunks, optionally ending in an error.
pub struct MockGenerator {
    chunks: Arc<Mutex<Vec<String>>>,
    stream_error: Arc<Mutex<Option<String>>>,
    start_error: Arc<Mutex<Option<String>>>,
    prompts: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            chunks: Arc::new(Mutex::new(Vec::new())),
            stream_error: Arc::new(Mutex::new(None)),
            start_error: Arc::new(Mutex::new(None)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_chunk(self, chunk: &str) -> Self {
        self.chunks.lock().unwrap().push(chunk.to_string());
        self
    }

    /// End the stream with an error after the scripted chunks.
    pub fn with_stream_error(self, message: &str) -> Self {
        *self.stream_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Fail before any chunk is produced.
    pub fn with_start_error(self, message: &str) -> Self {
        *self.start_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received so far, with the number of images attached to each.
    pub fn prompts(&self) -> Vec<(String, usize)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate_stream(&self, prompt: &str, images: &[Vec<u8>]) -> Result<TextStream> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), images.len()));

        if let Some(message) = self.start_error.lock().unwrap().clone() {
            return Err(Error::AiProvider(message));
        }

        let chunks = self.chunks.lock().unwrap().clone();
        let stream_error = self.stream_error.lock().unwrap().clone();

        let (tx, rx) = mpsc::channel(chunks.len() + 1);
        for chunk in chunks {
            // Capacity covers every item, so this never waits.
            let _ = tx.try_send(Ok(chunk));
        }
        if let Some(message) = stream_error {
            let _ = tx.try_send(Err(Error::AiProvider(message)));
        }

        Ok(rx)
    }
}
