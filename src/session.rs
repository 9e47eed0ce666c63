//! Prompt session: validates a prompt, streams the model's answer and
//! publishes the running result as observable UI state.

use crate::ai::ContentGenerator;
use crate::prompt::validate_prompt;
use crate::Error;
use tokio::sync::watch;

/// Message shown when a generation error carries no description.
pub const UNKNOWN_GENERATING_ERROR: &str = "unknown generating error...";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptUiState {
    pub images: Vec<Vec<u8>>,
    pub prompt_result: Option<String>,
    pub in_progress: bool,
    pub error: Option<String>,
}

pub struct PromptSession<G: ContentGenerator> {
    generator: G,
    state: watch::Sender<PromptUiState>,
}

impl<G: ContentGenerator> PromptSession<G> {
    pub fn new(generator: G) -> Self {
        let (state, _) = watch::channel(PromptUiState::default());
        Self { generator, state }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<PromptUiState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PromptUiState {
        self.state.borrow().clone()
    }

    pub fn set_images(&self, images: Vec<Vec<u8>>) {
        self.state.send_modify(|state| state.images = images);
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    /// Validate and run `prompt` with the current images.
    ///
    /// Validation failures only set `error`; the generator is not called.
    /// Returns the state after the stream has finished.
    pub async fn submit(&self, prompt: &str) -> PromptUiState {
        let images = self.state.borrow().images.clone();

        if let Err(e) = validate_prompt(prompt, &images) {
            tracing::debug!("Rejected prompt: {}", e);
            self.state
                .send_modify(|state| state.error = Some(e.to_string()));
            return self.state();
        }

        self.state.send_modify(|state| {
            state.in_progress = true;
            state.prompt_result = None;
            state.error = None;
        });

        let mut stream = match self.generator.generate_stream(prompt, &images).await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(&e);
                return self.state();
            }
        };

        let mut result = String::new();
        while let Some(item) = stream.recv().await {
            match item {
                Ok(chunk) => {
                    result.push_str(&chunk);
                    let running = result.clone();
                    self.state.send_modify(|state| {
                        state.prompt_result = Some(running);
                        state.error = None;
                    });
                }
                Err(e) => {
                    self.fail(&e);
                    return self.state();
                }
            }
        }

        tracing::debug!("Generation finished ({} bytes)", result.len());
        self.state.send_modify(|state| state.in_progress = false);
        self.state()
    }

    fn fail(&self, error: &Error) {
        tracing::error!("Generation failed: {}", error);
        let message = error_message(error);
        self.state.send_modify(|state| {
            state.in_progress = false;
            state.error = Some(message);
        });
    }
}

fn error_message(error: &Error) -> String {
    let message = match error {
        Error::AiProvider(message) | Error::Generic(message) => message.clone(),
        other => other.to_string(),
    };

    if message.trim().is_empty() {
        UNKNOWN_GENERATING_ERROR.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockGenerator;
    use crate::prompt::CONTENT_LIMIT_SIZE;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_submit_accumulates_chunks() {
        let session = PromptSession::new(
            MockGenerator::new()
                .with_chunk("The sky ")
                .with_chunk("is blue."),
        );

        let state = session.submit("Why is the sky blue?").await;
        assert_eq!(
            state,
            PromptUiState {
                images: Vec::new(),
                prompt_result: Some("The sky is blue.".to_string()),
                in_progress: false,
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn test_observer_sees_running_text() {
        let session = PromptSession::new(MockGenerator::new().with_chunk("a").with_chunk("b"));
        let mut rx = session.subscribe();

        let collector = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                seen.push(state.clone());
                if !state.in_progress && state.prompt_result.as_deref() == Some("ab") {
                    break;
                }
            }
            seen
        });

        session.submit("go").await;
        let seen = collector.await.unwrap();

        assert_eq!(seen.last().unwrap().prompt_result.as_deref(), Some("ab"));
        assert!(!seen.last().unwrap().in_progress);
    }

    #[tokio::test]
    async fn test_blank_prompt_sets_error_without_calling_generator() {
        let session = PromptSession::new(MockGenerator::new().with_chunk("unused"));

        let state = session.submit("   ").await;
        assert_eq!(state.error.as_deref(), Some("prompt can not be empty..."));
        assert!(!state.in_progress);
        assert_eq!(session.generator().get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_prompt_sets_error() {
        let session = PromptSession::new(MockGenerator::new());
        session.set_images(vec![vec![0u8; CONTENT_LIMIT_SIZE]]);

        let state = session.submit("describe").await;
        assert_eq!(
            state.error.as_deref(),
            Some("the entire prompt is too large, 4MB limited")
        );
        assert_eq!(session.generator().get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_images_are_forwarded() {
        let session = PromptSession::new(MockGenerator::new().with_chunk("ok"));
        session.set_images(vec![vec![1, 2, 3], vec![4]]);

        session.submit("what are these?").await;
        assert_eq!(
            session.generator().prompts(),
            vec![("what are these?".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_stream_error_keeps_partial_result() {
        let session = PromptSession::new(
            MockGenerator::new()
                .with_chunk("partial")
                .with_stream_error("connection reset"),
        );

        let state = session.submit("hello").await;
        assert_eq!(state.prompt_result.as_deref(), Some("partial"));
        assert_eq!(state.error.as_deref(), Some("connection reset"));
        assert!(!state.in_progress);
    }

    #[tokio::test]
    async fn test_empty_error_uses_fallback_message() {
        let session = PromptSession::new(MockGenerator::new().with_start_error(""));

        let state = session.submit("hello").await;
        assert_eq!(state.error.as_deref(), Some(UNKNOWN_GENERATING_ERROR));
        assert!(!state.in_progress);
    }

    #[tokio::test]
    async fn test_new_submit_clears_previous_result_and_error() {
        let session = PromptSession::new(MockGenerator::new().with_chunk("fresh"));

        session.submit("").await;
        assert!(session.state().error.is_some());

        let state = session.submit("again").await;
        assert_eq!(state.error, None);
        assert_eq!(state.prompt_result.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_clear_error() {
        let session = PromptSession::new(MockGenerator::new());
        session.submit("").await;

        session.clear_error();
        assert_eq!(session.state().error, None);
    }
}
