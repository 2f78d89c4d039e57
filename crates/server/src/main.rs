use clap::{Parser, ValueEnum};
use lexrag_core::config;
use lexrag_core::corpus::CorpusSnapshot;
use lexrag_core::index::IndexRegistry;
use lexrag_core::rerank::{PairwiseReranker, PassthroughReranker, Reranker};
use lexrag_server::api::handlers::AppState;
use lexrag_server::api::{create_router, metrics};
use lexrag_server::oracle::{
    JudgmentClient, LlmEvaluator, LlmExpander, QueryExpander, SynonymExpander,
};
use lexrag_server::orchestrator::{PipelineConfig, SearchPipeline};
use lexrag_server::remote::LawPortalClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RerankerKind {
    /// Pairwise lexical-agreement model.
    Pairwise,
    /// Renormalize fusion scores only.
    Passthrough,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExpanderKind {
    /// Built-in legal synonym table.
    Synonym,
    /// LLM-backed broadening (requires --oracle-url and LEXRAG_ORACLE_KEY).
    Llm,
}

#[derive(Parser)]
#[command(name = "lexrag", about = "Legal-passage retrieval server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Path to the corpus snapshot JSON produced by ingestion
    #[arg(short, long, default_value = "./corpus/snapshot.json")]
    corpus: String,

    /// Base URL of the authoritative law portal
    #[arg(long, default_value = config::DEFAULT_PORTAL_URL)]
    portal_url: String,

    /// Caller id for the law portal (omit to disable the remote source).
    /// Falls back to the LEXRAG_PORTAL_ID env var.
    #[arg(long)]
    portal_id: Option<String>,

    /// Base URL of the judgment oracle (chat-completions style). Required
    /// for self-healing and the LLM expander.
    #[arg(long)]
    oracle_url: Option<String>,

    /// Model name sent to the judgment oracle
    #[arg(long, default_value = "lex-judge-1")]
    oracle_model: String,

    /// Active re-ranker implementation
    #[arg(long, value_enum, default_value_t = RerankerKind::Pairwise)]
    reranker: RerankerKind,

    /// Query expander used by the self-healing loop
    #[arg(long, value_enum, default_value_t = ExpanderKind::Synonym)]
    expander: ExpanderKind,

    /// Overall per-search deadline in seconds
    #[arg(long, default_value_t = config::SEARCH_DEADLINE_SECS)]
    search_deadline: u64,

    /// Result cache TTL in seconds (0 = disabled)
    #[arg(long, default_value_t = config::RESULT_CACHE_TTL_SECS)]
    cache_ttl: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(
                    "lexrag_server=info"
                        .parse()
                        .expect("valid directive literal"),
                )
                .add_directive(
                    "lexrag_core=info"
                        .parse()
                        .expect("valid directive literal"),
                ),
        )
        .init();

    let args = Args::parse();

    if args.port == 0 {
        eprintln!("Error: port must be > 0");
        std::process::exit(1);
    }

    let corpus = match CorpusSnapshot::from_file(std::path::Path::new(&args.corpus)) {
        Ok(corpus) => corpus,
        Err(e) => {
            eprintln!("Error: failed to load corpus '{}': {}", args.corpus, e);
            std::process::exit(1);
        }
    };
    if corpus.skipped() > 0 {
        tracing::warn!(
            skipped = corpus.skipped(),
            "corpus entries dropped during load"
        );
    }
    for (kind, count) in corpus.counts() {
        tracing::info!(collection = %kind, documents = count, "collection loaded");
    }

    // Indexes and the pipeline are built once here and shared by every
    // search call.
    let registry = IndexRegistry::build_all(&corpus);

    let reranker: Arc<dyn Reranker> = match args.reranker {
        RerankerKind::Pairwise => Arc::new(PairwiseReranker),
        RerankerKind::Passthrough => Arc::new(PassthroughReranker),
    };

    let pipeline_config = PipelineConfig {
        deadline: Duration::from_secs(args.search_deadline),
        cache_ttl: Duration::from_secs(args.cache_ttl),
        ..PipelineConfig::default()
    };
    let mut pipeline = SearchPipeline::new(registry, reranker, pipeline_config);

    let portal_id = args
        .portal_id
        .or_else(|| std::env::var("LEXRAG_PORTAL_ID").ok());
    match portal_id {
        Some(id) => {
            tracing::info!(portal = %args.portal_url, "remote portal source enabled");
            pipeline = pipeline
                .with_remote(Arc::new(LawPortalClient::new(args.portal_url.clone(), id)));
        }
        None => {
            tracing::info!("no portal caller id configured, running lexical-only");
        }
    }

    if let Some(ref oracle_url) = args.oracle_url {
        let api_key = std::env::var("LEXRAG_ORACLE_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("LEXRAG_ORACLE_KEY is empty, oracle calls may be rejected");
        }
        let client = Arc::new(JudgmentClient::new(
            oracle_url.clone(),
            api_key,
            args.oracle_model.clone(),
        ));
        let expander: Arc<dyn QueryExpander> = match args.expander {
            ExpanderKind::Synonym => Arc::new(SynonymExpander),
            ExpanderKind::Llm => Arc::new(LlmExpander::new(client.clone())),
        };
        pipeline = pipeline.with_oracles(Arc::new(LlmEvaluator::new(client)), expander);
        tracing::info!(oracle = %oracle_url, "self-healing oracles enabled");
    } else {
        tracing::info!("no oracle endpoint configured, self-healing runs fail-open");
    }

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let corpus = Arc::new(corpus);
    metrics::record_corpus(&corpus);

    let state = AppState {
        pipeline: Arc::new(pipeline),
        corpus: corpus.clone(),
        prometheus_handle,
        start_time: Instant::now(),
    };

    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        corpus = %args.corpus,
        documents = corpus.total_documents(),
        "lexrag ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
