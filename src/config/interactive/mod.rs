
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::PathBuf;

use crate::embeddings::OllamaClient;

use super::{Config, EmbeddingConfig, GenerationConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 askdoc Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Training Document").bold().yellow());
    configure_document(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embedding generation.");
    eprintln!();
    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Generation Configuration").bold().yellow());
    configure_generation(&mut config.generation)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.embedding) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before asking questions.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Document:").bold().yellow());
    eprintln!("  Path: {}", style(config.document.path.display()).cyan());

    eprintln!();
    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!(
        "  Chunk Size: {}",
        style(config.chunking.chunk_size).cyan()
    );
    eprintln!(
        "  Chunk Overlap: {}",
        style(config.chunking.chunk_overlap).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Embedding (Ollama):").bold().yellow());
    eprintln!("  Host: {}", style(&config.embedding.host).cyan());
    eprintln!("  Port: {}", style(config.embedding.port).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!(
        "  Batch Size: {}",
        style(config.embedding.batch_size).cyan()
    );
    match config.embedding.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!("{}", style("Generation:").bold().yellow());
    eprintln!("  Model: {}", style(&config.generation.model).cyan());
    eprintln!(
        "  Max Retries: {}",
        style(config.generation.max_retries).cyan()
    );
    eprintln!(
        "  Max Output Tokens: {}",
        style(config.generation.max_output_tokens).cyan()
    );
    let mode = if config.generation.dev || config.generation.api_key.is_none() {
        style("dev (offline)").yellow()
    } else {
        style("live").green()
    };
    eprintln!("  Mode: {}", mode);

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: Config::config_dir()?,
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_document(config: &mut Config) -> Result<()> {
    let path: String = Input::new()
        .with_prompt("Training document path")
        .default(config.document.path.display().to_string())
        .interact_text()?;
    config.document.path = PathBuf::from(path);

    if !config.document.path.exists() {
        eprintln!(
            "{}",
            style("⚠ Warning: The document does not exist yet at that path").yellow()
        );
    }

    Ok(())
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_protocol = protocols
        .iter()
        .position(|p| *p == embedding.protocol)
        .unwrap_or(0);
    let protocol = Select::new()
        .with_prompt("Protocol")
        .items(protocols)
        .default(default_protocol)
        .interact()?;
    embedding.protocol = protocols[protocol].to_string();

    embedding.host = Input::new()
        .with_prompt("Ollama host")
        .default(embedding.host.clone())
        .interact_text()?;

    embedding.port = Input::new()
        .with_prompt("Ollama port")
        .default(embedding.port)
        .interact_text()?;

    embedding.model = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .interact_text()?;

    embedding.batch_size = Input::new()
        .with_prompt("Embedding batch size")
        .default(embedding.batch_size)
        .interact_text()?;

    Ok(())
}

fn configure_generation(generation: &mut GenerationConfig) -> Result<()> {
    generation.model = Input::new()
        .with_prompt("Generation model")
        .default(generation.model.clone())
        .interact_text()?;

    generation.max_retries = Input::new()
        .with_prompt("Max retries on rate limit")
        .default(generation.max_retries)
        .interact_text()?;

    generation.dev = Confirm::new()
        .with_prompt("Force dev mode (no live model calls)?")
        .default(generation.dev)
        .interact()?;

    if !generation.dev {
        eprintln!(
            "Set {} in the environment to enable live generation.",
            style("GEMINI_API_KEY").cyan()
        );
    }

    Ok(())
}

fn test_ollama_connection(embedding: &EmbeddingConfig) -> bool {
    OllamaClient::new(embedding).is_ok_and(|client| client.ping().is_ok())
}
