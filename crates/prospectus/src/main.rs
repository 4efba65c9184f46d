//! The `prospectus` CLI.
//!
//! Thin driver over [`LocalEngine`]: ingest brochures, query them, and
//! drain the embedding retry surface, with JSON snapshots under a state
//! directory so runs compose.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use prospectus::{
    CancelContext, Config, IngestionRequest, JobStatus, LocalEngine, RetrievalRequest,
};

#[derive(Parser)]
#[command(name = "prospectus", version, about = "Product-brochure knowledge pipeline")]
struct Cli {
    /// Directory holding the JSON state snapshots.
    #[arg(long, global = true, default_value = ".prospectus")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one brochure (markdown directly, or a PDF via the external
    /// extractor).
    Ingest {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        product: Uuid,
        #[arg(long)]
        campaign: Option<Uuid>,
        /// Markdown source path.
        #[arg(long, conflicts_with = "pdf")]
        markdown: Option<PathBuf>,
        /// PDF source path.
        #[arg(long)]
        pdf: Option<PathBuf>,
        #[arg(long, default_value = "cli")]
        operator: String,
        /// Supersede disagreeing values instead of recording conflicts.
        #[arg(long)]
        overwrite: bool,
    },
    /// Query the knowledge base.
    Query {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        product: Uuid,
        /// Natural-language question.
        #[arg(long)]
        question: Option<String>,
        /// Requested spec names (repeatable; switches to structured mode).
        #[arg(long = "spec")]
        specs: Vec<String>,
        #[arg(long)]
        max_chunks: Option<usize>,
        /// Include a composed summary.
        #[arg(long)]
        summary: bool,
        /// Include recent lineage events.
        #[arg(long)]
        lineage: bool,
    },
    /// Re-embed chunks left incomplete by earlier runs.
    RetryEmbeddings {
        #[arg(long)]
        tenant: Uuid,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> prospectus::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    let engine = LocalEngine::load(&cli.state_dir, config)?;
    let cancel = CancelContext::none();

    match cli.command {
        Command::Ingest {
            tenant,
            product,
            campaign,
            markdown,
            pdf,
            operator,
            overwrite,
        } => {
            let request = IngestionRequest {
                tenant_id: tenant,
                product_id: product,
                campaign_id: campaign,
                markdown_path: markdown,
                pdf_path: pdf,
                operator,
                overwrite,
                auto_publish: false,
            };
            let result = engine.pipeline.ingest(&request, &cancel);
            engine.save(&cli.state_dir)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.status == JobStatus::Failed {
                return Err(prospectus::Error::Internal("ingestion failed".into()));
            }
        }
        Command::Query {
            tenant,
            product,
            question,
            specs,
            max_chunks,
            summary,
            lineage,
        } => {
            let mut request = if specs.is_empty() {
                RetrievalRequest::question(tenant, product, question.unwrap_or_default())
            } else {
                RetrievalRequest::structured(tenant, product, specs)
            };
            request.max_chunks = max_chunks;
            request.include_summary = summary;
            request.include_lineage = lineage;
            let response = engine.router.query(&request, &cancel)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::RetryEmbeddings { tenant } => {
            let outcome = engine.pipeline.retry_incomplete_embeddings(tenant, &cancel)?;
            engine.save(&cli.state_dir)?;
            println!(
                "{}",
                serde_json::json!({
                    "succeeded": outcome.succeeded,
                    "failed": outcome.failed,
                    "errors": outcome.errors,
                })
            );
        }
    }
    Ok(())
}
