//! Text generation backends
//!
//! [`ContentGenerator`] is the seam between a [`PromptSession`](crate::session::PromptSession)
//! and the remote model. Gemini is the production backend; [`MockGenerator`]
//! scripts responses for tests.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::GeminiGenerator;
pub use mock::MockGenerator;

use crate::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Streamed text chunks. An `Err` item ends the stream.
pub type TextStream = mpsc::Receiver<Result<String>>;

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Start generating a response to `prompt` with optional inline images.
    async fn generate_stream(&self, prompt: &str, images: &[Vec<u8>]) -> Result<TextStream>;
}
