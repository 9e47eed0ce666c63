//! Model catalogue and runtime configuration
//!
//! Defines the models the client can talk to, their wire identifiers and
//! token limits, plus the environment-driven [`Config`].

use crate::codec;
use crate::resilient_enum;
use std::path::PathBuf;

resilient_enum! {
    /// A generative model known to this client.
    pub enum AiModel {
        fallback = GeminiPro;
        Gpt35Turbo = "",
        GeminiPro = "gemini-pro",
        GeminiProVision = "gemini-pro-vision",
    }
}

impl AiModel {
    /// Token limit enforced client-side, if the model has one.
    pub fn max_tokens(&self) -> Option<u32> {
        match self {
            AiModel::Gpt35Turbo => Some(4096),
            AiModel::GeminiPro | AiModel::GeminiProVision => None,
        }
    }

    /// Whether prompts to this model may carry inline images.
    pub fn supports_images(&self) -> bool {
        matches!(self, AiModel::GeminiProVision)
    }

    /// Resolve a model name, falling back to [`AiModel::GeminiPro`].
    pub fn from_model_name(name: &str) -> Self {
        codec::decode(name)
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_base_url: Option<String>,
    pub model: Option<AiModel>,
    pub settings_path: PathBuf,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .map_err(|_| crate::Error::Config("GEMINI_API_KEY not set".to_string()))?,
            gemini_base_url: std::env::var("GEMINI_BASE_URL").ok(),
            model: std::env::var("GEMINI_MODEL")
                .ok()
                .map(|name| AiModel::from_model_name(&name)),
            settings_path: std::env::var("EASY_GEMINI_SETTINGS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".easy-gemini/settings.json")),
        })
    }
}
