use anyhow::{Context, Result};
use clap::Parser;
use spanlight::highlight::{HighlightQuery, SpanHighlighter};
use spanlight::metrics::HighlightMetrics;
use spanlight::schema::{IndexMapping, Schema};
use spanlight::{Document, HighlightConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spanlight")]
#[command(about = "Highlight query matches in stored documents", long_about = None)]
struct Args {
    /// JSON file with an array of documents: [{"id": "1", "fields": [["text", "..."]]}]
    #[arg(env = "SPANLIGHT_DOCS")]
    docs: PathBuf,

    /// Primary query string, highlighted when no --hl-q is given
    #[arg(long = "q")]
    query: String,

    /// Fields to highlight, comma or space separated; wildcards allowed
    #[arg(long = "fl", env = "SPANLIGHT_FIELDS")]
    fields: Option<String>,

    /// Tag inserted before each highlight
    #[arg(long)]
    pre: Option<String>,

    /// Tag inserted after each highlight
    #[arg(long)]
    post: Option<String>,

    /// Additional highlight query; repeat for several, earlier ones win overlaps
    #[arg(long = "hl-q")]
    highlight_queries: Vec<String>,

    /// Highlighter configuration (JSON)
    #[arg(long, env = "SPANLIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Field mapping (JSON)
    #[arg(long, env = "SPANLIGHT_MAPPING")]
    mapping: Option<PathBuf>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr, highlights to stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => HighlightConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => HighlightConfig::default(),
    };
    if let Some(pre) = &args.pre {
        config.pre_tag = pre.clone();
    }
    if let Some(post) = &args.post {
        config.post_tag = post.clone();
    }
    debug!(?config, "configuration");

    let schema = match &args.mapping {
        Some(path) => {
            let mapping = IndexMapping::from_json_file(path)
                .with_context(|| format!("failed to load mapping from {}", path.display()))?;
            Schema::new(mapping, config.tokenizer_config.clone())
        }
        None => Schema::dynamic(config.tokenizer_config.clone()),
    };

    let docs = Document::load_all(&args.docs)
        .with_context(|| format!("failed to load documents from {}", args.docs.display()))?;

    let metrics = HighlightMetrics::new()?;
    let highlighter = SpanHighlighter::new(config, Arc::new(schema)).with_metrics(metrics.clone());

    let primary = highlighter
        .parse_query(&args.query)
        .context("invalid primary query")?;

    let mut request = highlighter.request();
    if let Some(fields) = &args.fields {
        request = request.with_field_list(fields);
    }
    for query in &args.highlight_queries {
        request = request.with_query(HighlightQuery::new(query));
    }

    info!(
        documents = docs.len(),
        queries = request.queries.len(),
        "Starting spanlight v{}",
        spanlight::VERSION
    );

    let response = highlighter.highlight(&docs, &primary, &request)?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", output);

    if args.metrics {
        eprint!("{}", metrics.encode()?);
    }

    Ok(())
}
