//! Process configuration read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Which transport the bot talks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Telegram,
    Cli,
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "telegram" => Ok(Self::Telegram),
            "cli" => Ok(Self::Cli),
            other => Err(format!("unknown channel '{other}' (expected telegram or cli)")),
        }
    }
}

/// Where interview questions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionMode {
    /// The block's configured question list, in order.
    Static,
    /// Questions written by the generator from block context and dialogue.
    Generative,
}

impl FromStr for QuestionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "generative" => Ok(Self::Generative),
            other => Err(format!("unknown question mode '{other}' (expected static or generative)")),
        }
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub channel: ChannelKind,
    /// Required when `channel` is Telegram.
    pub telegram_token: Option<SecretString>,
    /// Usernames or numeric ids; `*` admits everyone.
    pub allowed_users: Vec<String>,
    pub llm: LlmConfig,
    /// Admissions per user inside one rate window.
    pub rate_limit: usize,
    pub rate_window: Duration,
    /// Sessions idle longer than this are swept.
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    /// Deadline for question and summary calls.
    pub call_timeout: Duration,
    /// Deadline for extraction and archetype calls.
    pub extraction_timeout: Duration,
    pub question_mode: QuestionMode,
    pub archetype_match: bool,
    pub interview_config_path: PathBuf,
    pub schema_path: PathBuf,
    pub results_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl BotConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let channel: ChannelKind = parse_or(&get, "INTERVIEW_CHANNEL", ChannelKind::Telegram)?;

        let telegram_token = get("TELEGRAM_BOT_TOKEN").map(SecretString::from);
        if channel == ChannelKind::Telegram && telegram_token.is_none() {
            return Err(ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string()));
        }

        let allowed_users: Vec<String> = get("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let backend: LlmBackend = parse_or(&get, "INTERVIEW_LLM_BACKEND", LlmBackend::OpenAi)?;
        let api_key = get(backend.api_key_var())
            .ok_or_else(|| ConfigError::MissingEnvVar(backend.api_key_var().to_string()))?;
        let model = get("INTERVIEW_MODEL").unwrap_or_else(|| backend.default_model().to_string());

        let rate_limit: usize = parse_or(&get, "INTERVIEW_RATE_LIMIT", 10)?;
        if rate_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INTERVIEW_RATE_LIMIT".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            channel,
            telegram_token,
            allowed_users,
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
            },
            rate_limit,
            rate_window: secs(&get, "INTERVIEW_RATE_WINDOW_SECS", 60)?,
            session_ttl: secs(&get, "INTERVIEW_SESSION_TTL_SECS", 86_400)?,
            sweep_interval: secs(&get, "INTERVIEW_SWEEP_INTERVAL_SECS", 3_600)?,
            call_timeout: secs(&get, "INTERVIEW_CALL_TIMEOUT_SECS", 90)?,
            extraction_timeout: secs(&get, "INTERVIEW_EXTRACTION_TIMEOUT_SECS", 180)?,
            question_mode: parse_or(&get, "INTERVIEW_QUESTION_MODE", QuestionMode::Static)?,
            archetype_match: parse_or(&get, "INTERVIEW_ARCHETYPE_MATCH", true)?,
            interview_config_path: get("INTERVIEW_CONFIG_PATH")
                .unwrap_or_else(|| "config/interview.yaml".to_string())
                .into(),
            schema_path: get("INTERVIEW_SCHEMA_PATH")
                .unwrap_or_else(|| "config/profile_schema.yaml".to_string())
                .into(),
            results_dir: get("INTERVIEW_RESULTS_DIR")
                .unwrap_or_else(|| "results".to_string())
                .into(),
            profiles_dir: get("INTERVIEW_PROFILES_DIR")
                .unwrap_or_else(|| "output".to_string())
                .into(),
            log_dir: get("INTERVIEW_LOG_DIR").map(PathBuf::from),
        })
    }

    /// Whether everyone may talk to the bot.
    pub fn allows_everyone(&self) -> bool {
        self.allowed_users.iter().any(|u| u == "*")
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
    }
}

fn secs<G>(get: &G, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value: u64 = parse_or(get, key, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(value))
}
