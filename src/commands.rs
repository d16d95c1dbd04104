use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::pipeline::{QueryPipeline, StreamEvent};

/// Answer a question against the configured training document.
#[inline]
pub fn ask(question: &str, top_k: Option<usize>, stream: bool) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(top_k) = top_k {
        config.retrieval.top_k = top_k;
    }
    config.validate().context("Configuration is invalid")?;

    let pipeline = build_pipeline(&config)?;

    if stream {
        ask_streaming(&pipeline, question)
    } else {
        let answer = pipeline
            .answer_once(question)
            .context("Failed to answer question")?;
        println!("{answer}");
        Ok(())
    }
}

fn ask_streaming(pipeline: &QueryPipeline, question: &str) -> Result<()> {
    let mut stdout = std::io::stdout();

    for event in pipeline
        .answer_streaming(question)
        .context("Failed to start streamed answer")?
    {
        match event {
            StreamEvent::Started => {
                eprintln!("{}", style("Thinking...").dim());
            }
            StreamEvent::Fragment(text) => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            StreamEvent::Done => {
                writeln!(stdout)?;
            }
        }
    }

    Ok(())
}

/// Build the full query pipeline, with a spinner while the index is built.
/// Embedding the whole corpus can take a while on a cold Ollama instance.
fn build_pipeline(config: &Config) -> Result<QueryPipeline> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").context("Invalid progress template")?,
    );
    spinner.set_message("Building retrieval index...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let pipeline = QueryPipeline::build(config);

    match &pipeline {
        Ok(p) => spinner.finish_with_message(format!(
            "Index ready: {} chunks, dimension {}",
            p.retriever().chunk_count(),
            p.retriever().dimension()
        )),
        Err(_) => spinner.finish_and_clear(),
    }

    Ok(pipeline?)
}

/// Show detailed status of the question-answering pipeline
#[inline]
pub fn show_status() -> Result<()> {
    let config = Config::load()?;

    eprintln!("{}", style("📊 askdoc Status").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Training Document:").bold().yellow());
    let path = &config.document.path;
    if path.exists() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read training document {}", path.display()))?;
        let char_count = text.chars().count();
        let chunks = crate::chunker::chunk_text(&text, &config.chunking)?;
        eprintln!("  Path: {}", style(path.display()).cyan());
        eprintln!("  Characters: {}", style(char_count).cyan());
        eprintln!("  Chunks: {}", style(chunks.len()).cyan());
    } else {
        eprintln!(
            "  Path: {} {}",
            style(path.display()).cyan(),
            style("(missing)").red()
        );
    }

    eprintln!();
    eprintln!("{}", style("Embedding Backend:").bold().yellow());
    match OllamaClient::new(&config.embedding) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                eprintln!("  Ollama: {}", style("reachable").green());
                eprintln!("  Model: {}", style(&config.embedding.model).cyan());
            }
            Err(e) => {
                eprintln!("  Ollama: {}", style("unreachable").red());
                eprintln!("  Error: {}", style(format!("{e:#}")).dim());
            }
        },
        Err(e) => {
            eprintln!("  Ollama: {}", style("misconfigured").red());
            eprintln!("  Error: {}", style(format!("{e:#}")).dim());
        }
    }

    eprintln!();
    eprintln!("{}", style("Generation Backend:").bold().yellow());
    let dev = config.generation.dev || config.generation.api_key.is_none();
    if dev {
        eprintln!("  Mode: {}", style("dev (offline, deterministic)").yellow());
    } else {
        eprintln!("  Mode: {}", style("live").green());
        eprintln!("  Model: {}", style(&config.generation.model).cyan());
    }

    info!("Status check complete");
    Ok(())
}
