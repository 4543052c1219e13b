//! GapFinder — research gap extraction from academic papers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use gapfinder_core::{GapFinderConfig, PageRecord, PaperMetadata};
use gapfinder_infer::{create_embedder, SemanticScorer, VaderSentiment};
use gapfinder_ingest::{JsonlPages, LayoutPages, TextPages};
use gapfinder_llm::{generate_comment_report, generate_report, HttpLlmClient, LLMConfig, LlmClient};
use gapfinder_runtime::{GapPipeline, RunResults, RunSummary, Verb};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod args;

use args::{Command, RunArgs};

type PageSource = Box<dyn Iterator<Item = gapfinder_core::Result<PageRecord>>>;

fn resolve_data_dir() -> PathBuf {
    std::env::var("GAPFINDER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

/// `.layout.jsonl` files are positioned text blocks, other `.jsonl` files are
/// page records, anything else is form-feed paged text.
fn open_pages(path: &Path) -> anyhow::Result<PageSource> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name.ends_with(".layout.jsonl") {
        return Ok(Box::new(LayoutPages::open(path)?));
    }
    if name.ends_with(".jsonl") {
        return Ok(Box::new(JsonlPages::open(path)?));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Box::new(TextPages::new(text).map(Ok)))
}

fn load_config(run: &RunArgs) -> anyhow::Result<GapFinderConfig> {
    let mut config = GapFinderConfig::load(run.config.as_deref())?;
    if let Some(threshold) = run.threshold {
        config.similarity_threshold = threshold;
    }
    if let Some(top_k) = run.top_k {
        config.top_k = top_k;
    }
    config.validate()?;
    Ok(config)
}

async fn execute(run: RunArgs) -> anyhow::Result<RunSummary> {
    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = load_config(&run)?;
    let mut pipeline = GapPipeline::new(config.clone())?;
    match run.verb {
        Verb::Scan => {
            pipeline = pipeline.with_sentiment(Box::new(VaderSentiment::new()));
        }
        Verb::Rank | Verb::Verify | Verb::Annotate => {
            // Initialize embedder (ONNX if available, otherwise semantic scoring fails)
            let embedder = create_embedder(&data_dir.join("models"));
            let scorer = SemanticScorer::new(Arc::clone(&embedder), &config.anchor_phrases)
                .context("Semantic scoring needs an ONNX model under <data-dir>/models")?;
            pipeline = pipeline.with_semantic(scorer);
        }
    }

    let client = match run.verb {
        Verb::Verify | Verb::Annotate => Some(llm_client(&data_dir)?),
        Verb::Scan | Verb::Rank => None,
    };
    let pages = open_pages(&run.input)?;
    analyze(&pipeline, client.as_ref(), &run, pages).await
}

/// Score the whole document, then run the LLM stage the verb asks for.
///
/// The page source must finish cleanly before any LLM request is sent.
async fn analyze<C: LlmClient>(
    pipeline: &GapPipeline,
    client: Option<&C>,
    run: &RunArgs,
    pages: PageSource,
) -> anyhow::Result<RunSummary> {
    let progress = |message: &str| info!("{}", message);
    let source_name = run
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| run.input.display().to_string());

    let (ranked, digest) = pipeline
        .run_document(run.verb.scoring_mode(), pages, Some(&progress))
        .with_context(|| format!("Failed to process {}", source_name))?;

    let papers = vec![PaperMetadata {
        title: run.title.clone().or_else(|| Some(source_name.clone())),
        author: run.author.clone(),
        doi: digest.doi().map(str::to_string),
    }];
    let settings = pipeline.batch_settings();

    let (results, report) = match (run.verb, client) {
        (Verb::Scan | Verb::Rank, _) => (RunResults::Scored(ranked), None),
        (Verb::Verify, Some(client)) => {
            let verified = pipeline.verify(client, ranked, Some(&progress)).await;
            let report = if run.report {
                Some(generate_report(client, &verified, &papers, &settings, Some(&progress)).await?)
            } else {
                None
            };
            (RunResults::Verified(verified), report)
        }
        (Verb::Annotate, Some(client)) => {
            let commented = pipeline.annotate(client, ranked, Some(&progress)).await?;
            let report = if run.report {
                Some(
                    generate_comment_report(client, &commented, &papers, &settings, Some(&progress))
                        .await?,
                )
            } else {
                None
            };
            (RunResults::Commented(commented), report)
        }
        (Verb::Verify | Verb::Annotate, None) => bail!("This command needs an LLM provider"),
    };

    info!(
        "Processed {} pages of {}: {} results",
        digest.page_count(),
        source_name,
        results.len()
    );

    let mut summary = RunSummary::new(source_name, &digest, run.verb, results);
    if let Some(report) = report {
        summary = summary.with_report(report);
    }
    Ok(summary)
}

fn llm_client(data_dir: &Path) -> anyhow::Result<HttpLlmClient> {
    let config = LLMConfig::load(&data_dir.join("llm-config.json"));
    let client = HttpLlmClient::from_config(&config)
        .context("Set GEMINI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY or OPENAI_API_KEY")?;
    info!("LLM provider: {} ({})", client.provider(), client.model());
    Ok(client)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args::parse(&args)? {
        Command::Help => {
            println!("{}", args::USAGE);
            Ok(())
        }
        Command::Run(run) => {
            let summary = execute(run).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}
