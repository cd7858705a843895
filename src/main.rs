use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use interview_bot::bot::{BotDeps, InterviewBot, RunOptions};
use interview_bot::channels::{Channel, CliChannel, TelegramChannel};
use interview_bot::config::{BotConfig, ChannelKind, QuestionMode};
use interview_bot::extraction::{ExtractionWorker, ProfileExtractor};
use interview_bot::interview::config::{load_interview_config, load_schema};
use interview_bot::interview::{
    InterviewMachine, LlmBlockSummarizer, LlmQuestionSource, QuestionSource, StaticQuestionSource,
};
use interview_bot::llm::{LlmProvider, TimeoutProvider, create_provider};
use interview_bot::metrics::Metrics;
use interview_bot::session::{RateLimiter, SessionRegistry};
use interview_bot::storage::ProfileStore;

const SUMMARY_MAX_TOKENS: u32 = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = BotConfig::from_env().context("invalid environment configuration")?;

    // Held for the whole process so buffered log lines are flushed on exit
    let _log_guard = init_tracing(&config);

    let interview_config = Arc::new(
        load_interview_config(&config.interview_config_path)
            .context("failed to load interview configuration")?,
    );
    let schema = Arc::new(load_schema(&config.schema_path).context("failed to load profile schema")?);

    eprintln!("🎯 Interview Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Channel: {:?}", config.channel);
    eprintln!("   Model: {} ({:?})", config.llm.model, config.llm.backend);
    eprintln!(
        "   Blocks: {}, up to {} questions each ({:?} questions)",
        interview_config.total_blocks(),
        interview_config.question_budget(),
        config.question_mode
    );
    eprintln!("   Schema fields: {}", schema.len());
    eprintln!(
        "   Results: {}, profiles: {}",
        config.results_dir.display(),
        config.profiles_dir.display()
    );
    if !config.allows_everyone() {
        eprintln!("   Allowed users: {}", config.allowed_users.join(", "));
    }
    if config.channel == ChannelKind::Cli {
        eprintln!("   Type /start and press Enter. Ctrl+C to exit.\n");
    }

    // ── LLM ─────────────────────────────────────────────────────────────
    let metrics = Arc::new(Metrics::new());
    let base = create_provider(&config.llm)?;
    let interview_llm: Arc<dyn LlmProvider> = Arc::new(
        TimeoutProvider::new(Arc::clone(&base), config.call_timeout)
            .with_metrics(Arc::clone(&metrics)),
    );
    let extraction_llm: Arc<dyn LlmProvider> = Arc::new(
        TimeoutProvider::new(base, config.extraction_timeout).with_metrics(Arc::clone(&metrics)),
    );

    // ── Interview ───────────────────────────────────────────────────────
    let questions: Arc<dyn QuestionSource> = match config.question_mode {
        QuestionMode::Static => Arc::new(StaticQuestionSource),
        QuestionMode::Generative => Arc::new(LlmQuestionSource::new(Arc::clone(&interview_llm))),
    };
    let machine = InterviewMachine::new(
        Arc::clone(&interview_config),
        questions,
        Arc::new(LlmBlockSummarizer::new(
            Arc::clone(&interview_llm),
            SUMMARY_MAX_TOKENS,
        )),
    );

    // ── Extraction ──────────────────────────────────────────────────────
    let store = ProfileStore::new(&config.results_dir, &config.profiles_dir);
    let extractor = Arc::new(ProfileExtractor::new(Arc::clone(&extraction_llm), schema));
    let archetype_llm = config.archetype_match.then(|| Arc::clone(&extraction_llm));
    let (worker, reports) = ExtractionWorker::new(
        extractor,
        store.clone(),
        archetype_llm,
        Arc::clone(&metrics),
    );

    // ── Channel ─────────────────────────────────────────────────────────
    let channel: Arc<dyn Channel> = match config.channel {
        ChannelKind::Cli => Arc::new(CliChannel::new()),
        ChannelKind::Telegram => {
            let token = config
                .telegram_token
                .clone()
                .context("TELEGRAM_BOT_TOKEN is required for the telegram channel")?;
            Arc::new(TelegramChannel::new(token, config.allowed_users.clone()))
        }
    };
    channel
        .health_check()
        .await
        .context("channel health check failed")?;

    let bot = Arc::new(InterviewBot::new(
        BotDeps {
            machine: Arc::new(machine),
            registry: Arc::new(SessionRegistry::new()),
            limiter: Arc::new(RateLimiter::new(config.rate_limit, config.rate_window)),
            store,
            worker: Arc::new(worker),
            metrics,
        },
        channel,
    ));

    let options = RunOptions {
        session_ttl: config.session_ttl,
        sweep_interval: config.sweep_interval,
        ..RunOptions::default()
    };
    bot.run(reports, options).await?;

    Ok(())
}

/// Console logging, plus a daily-rolling file when a log directory is set.
fn init_tracing(config: &BotConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer().with_target(false);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "interview-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            None
        }
    }
}
