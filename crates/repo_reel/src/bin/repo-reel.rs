use std::{net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use apalis::{
    layers::{retry::RetryPolicy, sentry::SentryLayer},
    prelude::*,
};
use apalis_cron::{CronStream, Tick};
use clap::{Parser, Subcommand};
use cron::Schedule;
use reel_datastore::InMemoryJobStore;
use tokio_util::sync::CancellationToken;

use repo_reel::{
    provider_chain, server, tracing::init_tracing_subscriber, ArchiveIngestor, CommandSpeech,
    FfmpegEncoder, JobRunner, PipelineConfig, ProviderKind, ReelProcessor, ReelProcessorBuilder,
    ScriptGenerator,
};

#[derive(Parser)]
#[command(name = "repo-reel", about = "Turns public GitHub repositories into short explainer videos")]
struct Cli {
    /// Working directory for per-job files and finished videos
    #[arg(long, env = "REEL_WORKDIR", default_value = "/var/tmp/repo-reel")]
    workdir: PathBuf,

    #[arg(long, env = "REEL_FPS", default_value = "25")]
    fps: u32,

    /// Output size as WIDTHxHEIGHT
    #[arg(long, env = "REEL_RESOLUTION", default_value = "1920x1080")]
    resolution: String,

    #[arg(long, env = "REEL_MIN_SECONDS", default_value = "30")]
    min_seconds: f64,

    #[arg(long, env = "REEL_MAX_SECONDS", default_value = "180")]
    max_seconds: f64,

    /// Narrate sections with a local speech engine when one is installed
    #[arg(long, env = "REEL_NARRATION", default_value = "true", action = clap::ArgAction::Set)]
    narration: bool,

    /// Provider priority order, comma separated
    #[arg(
        long,
        env = "REEL_PROVIDERS",
        value_delimiter = ',',
        default_value = "groq,openai,anthropic,together,huggingface"
    )]
    providers: Vec<ProviderKind>,

    /// Directory holding DejaVu or Liberation fonts
    #[arg(long, env = "REEL_FONT_DIR")]
    font_dir: Option<PathBuf>,

    /// Voice model for piper; espeak is used when unset
    #[arg(long, env = "REEL_PIPER_MODEL")]
    piper_model: Option<PathBuf>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    groq_api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    #[arg(long, env = "TOGETHER_API_KEY", hide_env_values = true)]
    together_api_key: Option<String>,

    #[arg(long, env = "HUGGINGFACE_API_KEY", hide_env_values = true)]
    huggingface_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API with a background worker pool
    Serve {
        #[arg(long, env = "REEL_BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// Jobs running the pipeline at the same time
        #[arg(long, env = "REEL_MAX_JOBS", default_value = "2")]
        max_jobs: usize,

        /// How long finished jobs and their videos are kept
        #[arg(long, env = "REEL_RETENTION_SECS", default_value = "3600")]
        retention_secs: u64,

        /// Cron schedule expression for the retention sweep
        #[arg(long, env = "SWEEP_SCHEDULE", default_value = "0 */5 * * * *")]
        sweep_schedule: String,
    },
    /// Run a single job in the foreground and print the video path
    Run {
        /// GitHub repository URL
        url: String,
    },
}

type Processor = ReelProcessor<Arc<InMemoryJobStore>, ArchiveIngestor, Option<CommandSpeech>, FfmpegEncoder>;
type Runner = JobRunner<Arc<InMemoryJobStore>, ArchiveIngestor, Option<CommandSpeech>, FfmpegEncoder>;

impl Cli {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let config = PipelineConfig {
            fps: self.fps.max(1),
            narration: self.narration,
            piper_model: self.piper_model.clone(),
            font_dir: self.font_dir.clone(),
            ..Default::default()
        };
        config
            .with_bounds(self.min_seconds, self.max_seconds)?
            .with_resolution(&self.resolution)
    }

    fn api_key(&self, kind: ProviderKind) -> Option<String> {
        match kind {
            ProviderKind::Groq => self.groq_api_key.clone(),
            ProviderKind::OpenAI => self.openai_api_key.clone(),
            ProviderKind::Anthropic => self.anthropic_api_key.clone(),
            ProviderKind::Together => self.together_api_key.clone(),
            ProviderKind::HuggingFace => self.huggingface_api_key.clone(),
        }
    }
}

async fn build_processor(cli: &Cli, store: Arc<InMemoryJobStore>) -> anyhow::Result<Processor> {
    let config = cli.pipeline_config()?;
    std::fs::create_dir_all(&cli.workdir)
        .with_context(|| format!("Failed to create workdir {}", cli.workdir.display()))?;

    let providers = provider_chain(&cli.providers, |kind| cli.api_key(kind));
    if providers.is_empty() {
        tracing::warn!("No provider API keys configured, scripts will come from the local template");
    }

    let speech = if config.narration {
        CommandSpeech::detect(config.piper_model.as_deref())
            .await
            .map(|speech| speech.with_timeout(config.speech_timeout))
    } else {
        None
    };

    let ingestor = ArchiveIngestor::new(config.ingest.clone()).with_token(cli.github_token.clone());
    let encoder = FfmpegEncoder::default().with_timeout(config.encode_timeout);

    Ok(ReelProcessorBuilder::new(&cli.workdir)
        .store(store)
        .ingestor(ingestor)
        .speech(speech)
        .encoder(encoder)
        .generator(ScriptGenerator::new(providers))
        .config(config)
        .build())
}

async fn handle_sweep(_tick: Tick, runner: Data<Arc<Runner>>) -> anyhow::Result<()> {
    let report = runner.sweep();
    tracing::debug!(?report, "Scheduled sweep finished");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let store = Arc::new(InMemoryJobStore::new());
    let processor = build_processor(&cli, store).await?;

    match cli.command {
        Command::Run { url } => {
            tracing::info!(%url, "Running a single job...");
            let output = processor.run(&url).await?;
            println!("{}", output.display());
        }
        Command::Serve {
            bind,
            max_jobs,
            retention_secs,
            sweep_schedule,
        } => {
            let shutdown = CancellationToken::new();
            let runner = Arc::new(
                JobRunner::new(processor, max_jobs)
                    .with_retention(Duration::from_secs(retention_secs))
                    .with_shutdown(shutdown.clone()),
            );

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("Failed to bind {bind}"))?;
            let router = server::create_router(Arc::clone(&runner));
            let http = tokio::spawn(server::serve(listener, router, shutdown.clone()));

            tracing::info!(schedule = %sweep_schedule, max_jobs, "Starting retention sweep...");
            let schedule = Schedule::from_str(&sweep_schedule)?;
            let worker = WorkerBuilder::new("repo-reel-sweep")
                .backend(CronStream::new(schedule))
                .retry(RetryPolicy::retries(3))
                .layer(SentryLayer::new())
                .data(runner)
                .build(handle_sweep);

            tokio::select! {
                result = worker.run() => result?,
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    tracing::info!("Ctrl-C received, shutting down");
                }
            }

            shutdown.cancel();
            http.await??;
        }
    }

    Ok(())
}
