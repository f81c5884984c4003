//! docchat CLI - main entry point
//!
//! Ask a question against the configured document index and print the
//! grounded answer.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use docchat::{metrics, ChatReadRetrieveRead, ChatTurn, Config, Overrides};
use tracing::warn;

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Conversational document Q&A over a search index", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and print the grounded answer
    Ask {
        /// The question to answer
        question: String,

        /// Number of documents to retrieve
        #[arg(short, long)]
        top: Option<u32>,

        /// Category to exclude from retrieval
        #[arg(long)]
        exclude_category: Option<String>,

        /// Use the semantic ranking mode
        #[arg(long, default_value_t = false)]
        semantic_ranker: bool,

        /// Use extractive captions instead of raw content
        #[arg(long, default_value_t = false)]
        semantic_captions: bool,

        /// Ask the model to suggest follow-up questions
        #[arg(long, default_value_t = false)]
        suggest_followups: bool,

        /// Prompt template override (prefix with >>> to inject into the default)
        #[arg(long)]
        prompt_template: Option<String>,

        /// Sampling temperature for answer generation
        #[arg(long)]
        temperature: Option<f32>,

        /// Print the debug trace (search query and final prompt)
        #[arg(long, default_value_t = false)]
        show_thoughts: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(addr) => metrics::spawn_metrics_server(addr),
            Err(err) => warn!("Invalid metrics address '{}': {}", addr, err),
        }
    }

    match cli.command {
        Commands::Ask {
            question,
            top,
            exclude_category,
            semantic_ranker,
            semantic_captions,
            suggest_followups,
            prompt_template,
            temperature,
            show_thoughts,
        } => {
            let config = Config::new();
            let approach = ChatReadRetrieveRead::from_config(&config)?;

            let overrides = Overrides {
                semantic_captions,
                top,
                exclude_category,
                semantic_ranker,
                suggest_followup_questions: suggest_followups,
                prompt_template,
                temperature,
            };

            let history = vec![ChatTurn::new(question)];
            let result = approach.run(&history, &overrides).await?;

            println!("{}", result.answer);

            if !result.data_points.is_empty() {
                println!("\nSources:");
                for data_point in &result.data_points {
                    println!("  {}", data_point);
                }
            }

            if show_thoughts {
                println!("\nThoughts:\n{}", result.thoughts.replace("<br>", "\n"));
            }
        }
    }

    Ok(())
}
