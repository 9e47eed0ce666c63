//! Application wiring for the command-line client.

use crate::ai::{ContentGenerator, GeminiGenerator};
use crate::codec::{self, Lookup};
use crate::models::{AiModel, Config};
use crate::prompt::validate_prompt;
use crate::session::{PromptSession, PromptUiState};
use crate::settings::{Settings, SettingsStore};
use crate::{Error, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Ties configuration, persisted settings and the Gemini backend together.
pub struct App {
    config: Config,
    settings: SettingsStore,
}

impl App {
    pub fn new(config: Config) -> Self {
        let settings = SettingsStore::new(config.settings_path.clone());
        Self { config, settings }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Model for this run: explicit override, then `GEMINI_MODEL`, then settings.
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<AiModel> {
        if let Some(name) = requested {
            return parse_model(name);
        }
        if let Some(model) = self.config.model {
            return Ok(model);
        }
        Ok(self.settings.load()?.model)
    }

    pub fn generator(&self, model: AiModel) -> Result<GeminiGenerator> {
        if model == AiModel::Gpt35Turbo {
            return Err(Error::Config(
                "gpt-3.5-turbo is not served by the Gemini API".to_string(),
            ));
        }

        let generator = GeminiGenerator::new(self.config.gemini_api_key.clone(), model);
        Ok(match &self.config.gemini_base_url {
            Some(base_url) => generator.with_base_url(base_url.clone()),
            None => generator,
        })
    }

    /// Run one prompt against Gemini, streaming text into `out`.
    ///
    /// An invalid prompt is rejected with [`Error::Prompt`] before any
    /// request is made.
    pub async fn generate(
        &self,
        prompt: &str,
        model: Option<&str>,
        image_paths: &[PathBuf],
        out: &mut (dyn Write + Send),
    ) -> Result<String> {
        let model = self.resolve_model(model)?;

        let mut images = Vec::with_capacity(image_paths.len());
        for path in image_paths {
            images.push(tokio::fs::read(path).await?);
        }
        validate_prompt(prompt, &images)?;

        info!("Generating with {} ({} image(s))", model, images.len());
        let session = PromptSession::new(self.generator(model)?);
        session.set_images(images);

        let state = stream_prompt(&session, prompt, out).await?;
        match state.error {
            Some(message) => Err(Error::Generic(message)),
            None => Ok(state.prompt_result.unwrap_or_default()),
        }
    }

    pub fn set_model(&self, name: &str) -> Result<Settings> {
        let model = parse_model(name)?;
        self.settings.update(|settings| settings.model = model)
    }
}

/// Strict model lookup for user input: unknown names are rejected rather
/// than silently replaced by the fallback.
pub fn parse_model(name: &str) -> Result<AiModel> {
    match codec::lookup::<AiModel>(name) {
        Lookup::Known(model) => Ok(model),
        Lookup::Fallback(_) => Err(Error::Config(format!(
            "unknown model '{}' (expected one of: {})",
            name,
            known_model_names().join(", ")
        ))),
    }
}

fn known_model_names() -> Vec<String> {
    use crate::codec::ResilientEnum;
    AiModel::VARIANTS
        .iter()
        .map(|variant| format!("{:?}", variant.wire))
        .collect()
}

/// Submit `prompt` on `session`, writing each newly streamed piece of text
/// to `out` as it arrives. Returns the final session state.
pub async fn stream_prompt<G: ContentGenerator>(
    session: &PromptSession<G>,
    prompt: &str,
    out: &mut (dyn Write + Send),
) -> Result<PromptUiState> {
    let mut updates = session.subscribe();
    let submit = session.submit(prompt);
    tokio::pin!(submit);

    let mut printed = 0;
    let state = loop {
        tokio::select! {
            state = &mut submit => break state,
            changed = updates.changed() => {
                if changed.is_err() {
                    break submit.await;
                }
                let text = updates.borrow_and_update().prompt_result.clone();
                printed = write_new_text(out, text.as_deref(), printed)?;
            }
        }
    };

    write_new_text(out, state.prompt_result.as_deref(), printed)?;
    Ok(state)
}

fn write_new_text(out: &mut (dyn Write + Send), text: Option<&str>, printed: usize) -> Result<usize> {
    let text = text.unwrap_or_default();
    if text.len() > printed {
        out.write_all(text[printed..].as_bytes())?;
        out.flush()?;
        return Ok(text.len());
    }
    Ok(printed)
}
