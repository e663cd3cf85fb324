use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{errors::Error, Result};

pub const DEFAULT_ABOUT_URL: &str = "https://github.com/ohmyarch/ohmyarch_bot";

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub http_proxy: Option<String>,
    pub poll_timeout: Duration,
    pub telegram_message_limit: usize,

    // Logging
    pub log_path: Option<PathBuf>,

    // Workers
    pub worker_idle_timeout: Duration,
    pub worker_queue_capacity: usize,

    // Replies
    pub about_url: String,
}

/// On-disk JSON config file.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    token: String,
    #[serde(default)]
    http_proxy: Option<String>,
    #[serde(default)]
    log_path: Option<PathBuf>,
}

impl Config {
    /// Load from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        let http_proxy = env_str("HTTP_PROXY_URL").and_then(non_empty);
        let log_path = env_str("LOG_PATH").and_then(non_empty).map(PathBuf::from);

        Self::with_env_defaults(telegram_bot_token, http_proxy, log_path)
    }

    /// Load from a JSON file of the shape `{ "token", "http_proxy"?, "log_path"? }`.
    ///
    /// Tuning knobs that the file does not carry still come from the environment.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("config file {} opening failed: {e}", path.display()))
        })?;
        let file: ConfigFile = serde_json::from_str(&raw)?;

        Self::with_env_defaults(
            file.token,
            file.http_proxy.and_then(non_empty),
            file.log_path,
        )
    }

    fn with_env_defaults(
        telegram_bot_token: String,
        http_proxy: Option<String>,
        log_path: Option<PathBuf>,
    ) -> Result<Self> {
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config("telegram bot token is required".to_string()));
        }

        let poll_timeout = Duration::from_secs(env_u64("POLL_TIMEOUT_SECS").unwrap_or(10));
        let telegram_message_limit = env_usize("TELEGRAM_MESSAGE_LIMIT").unwrap_or(4096);

        let worker_idle_timeout =
            Duration::from_millis(env_u64("WORKER_IDLE_TIMEOUT_MS").unwrap_or(10_000));
        let worker_queue_capacity = env_usize("WORKER_QUEUE_CAPACITY")
            .unwrap_or(100)
            .max(1);

        let about_url = env_str("ABOUT_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_ABOUT_URL.to_string());

        Ok(Self {
            telegram_bot_token,
            http_proxy,
            poll_timeout,
            telegram_message_limit,
            log_path,
            worker_idle_timeout,
            worker_queue_capacity,
            about_url,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }

    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
