//! llm-probe: check a provider credential and stream one prompt to stdout.
//!
//! Environment:
//!   AI_VISION_PROVIDER   openai | anthropic | gemini | grok (default: openai)
//!   AI_VISION_CONFIG     optional YAML config; otherwise the environment loader is used
//!   AI_VISION_PROMPT     prompt text (default: "Describe this screen.")
//!   AI_VISION_IMAGE      optional image file attached to the prompt
//!   RUST_LOG             tracing filter (default: info)

use ai_lib_vision::{create_client, ChatProvider, Message, ProviderConfig, ProviderKind};
use anyhow::{bail, Context};
use std::env;
use std::io::Write;
use tracing_subscriber::EnvFilter;

const DEFAULT_PROMPT: &str = "Describe this screen.";

fn load_config() -> anyhow::Result<ProviderConfig> {
    if let Ok(path) = env::var("AI_VISION_CONFIG") {
        return ProviderConfig::from_yaml_file(&path)
            .with_context(|| format!("loading config from {path}"));
    }
    let kind: ProviderKind = env::var("AI_VISION_PROVIDER")
        .unwrap_or_else(|_| "openai".to_string())
        .parse()?;
    Ok(ProviderConfig::from_env(kind)?)
}

fn build_message() -> anyhow::Result<Message> {
    let prompt = env::var("AI_VISION_PROMPT").unwrap_or_else(|_| DEFAULT_PROMPT.to_string());
    let mut message = Message::user(prompt);
    if let Ok(path) = env::var("AI_VISION_IMAGE") {
        let bytes = std::fs::read(&path).with_context(|| format!("reading image {path}"))?;
        message = message.with_image(bytes);
    }
    Ok(message)
}

async fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    let message = build_message()?;
    if message.contains_image() && !config.kind.supports_vision() {
        bail!("{} does not accept images", config.kind.display_name());
    }
    eprintln!("provider: {}  model: {}", config.kind.display_name(), config.model);

    let client = create_client(config)?;
    if !client.validate_key().await? {
        bail!("API key was rejected");
    }

    let mut stdout = std::io::stdout();
    let response = client
        .send_streaming(&[message], &mut |token: &str| {
            let _ = stdout.write_all(token.as_bytes());
            let _ = stdout.flush();
        })
        .await?;

    println!();
    eprintln!(
        "model: {}  finish: {}  tokens: {}",
        response.model,
        response.finish_reason.as_deref().unwrap_or("-"),
        response
            .total_tokens
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
