use askdoc::Result;
use askdoc::commands::{ask, show_status};
use askdoc::config::{run_interactive_config, show_config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "askdoc")]
#[command(about = "Question answering over a training document with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the training document, embedding backend, and model
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ask a question against the training document
    Ask {
        /// The question to answer
        question: String,
        /// Number of context chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
        /// Stream the answer fragment by fragment
        #[arg(long)]
        stream: bool,
    },
    /// Show detailed status of the question-answering pipeline
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ask {
            question,
            top_k,
            stream,
        } => {
            ask(&question, top_k, stream)?;
        }
        Commands::Status => {
            show_status()?;
        }
    }

    Ok(())
}
