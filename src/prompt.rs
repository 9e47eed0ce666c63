//! Prompt validation applied before anything is sent to the model.

use thiserror::Error;

/// Upper bound on prompt text plus inline image bytes (4 MiB).
pub const CONTENT_LIMIT_SIZE: usize = 4 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("prompt can not be empty...")]
    Blank,

    #[error("the entire prompt is too large, 4MB limited")]
    TooLarge { size: usize },
}

/// Total request payload in bytes: UTF-8 prompt text plus raw image bytes.
pub fn payload_size(text: &str, images: &[Vec<u8>]) -> usize {
    text.len() + images.iter().map(Vec::len).sum::<usize>()
}

pub fn validate_prompt(text: &str, images: &[Vec<u8>]) -> Result<(), PromptError> {
    if text.trim().is_empty() {
        return Err(PromptError::Blank);
    }

    let size = payload_size(text, images);
    if size > CONTENT_LIMIT_SIZE {
        return Err(PromptError::TooLarge { size });
    }

    Ok(())
}
