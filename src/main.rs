use anyhow::Result;
use clap::{Parser, Subcommand};
use easy_gemini::app::App;
use easy_gemini::codec::ResilientEnum;
use easy_gemini::models::{AiModel, Config};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "easy-gemini")]
#[command(about = "Send prompts to Gemini and stream the answers")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stream a response to a text prompt, optionally with images.
    Generate {
        /// Model wire name, e.g. `gemini-pro`.
        #[arg(long)]
        model: Option<String>,

        /// Image file to attach; may be repeated.
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        prompt: String,
    },
    /// List known models and their token limits.
    Models,
    /// Show or change persisted settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    SetModel { model: String },
}

fn print_models() {
    for variant in AiModel::VARIANTS {
        let limit = variant
            .value
            .max_tokens()
            .map(|max| max.to_string())
            .unwrap_or_else(|| "-".to_string());
        let fallback = if variant.value == AiModel::FALLBACK {
            " (default)"
        } else {
            ""
        };
        println!("{:<20} {:>6}{}", format!("{:?}", variant.wire), limit, fallback);
    }
}

async fn run(command: Command) -> easy_gemini::Result<()> {
    if let Command::Models = command {
        print_models();
        return Ok(());
    }

    let app = App::new(Config::from_env()?);

    match command {
        Command::Generate {
            model,
            images,
            prompt,
        } => {
            let mut stdout = std::io::stdout();
            app.generate(&prompt, model.as_deref(), &images, &mut stdout)
                .await?;
            println!();
        }
        Command::Settings { action } => {
            let settings = match action {
                SettingsAction::Show => app.settings().load()?,
                SettingsAction::SetModel { model } => app.set_model(&model)?,
            };
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Command::Models => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easy_gemini=info,resilient_enum=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    easy_gemini::validate_enums()?;

    let args = CliArgs::parse();

    match run(args.command).await {
        Ok(()) => {
            info!("Done");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            std::process::exit(1);
        }
    }
}
