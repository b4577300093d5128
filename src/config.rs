//! Client configuration.
//!
//! Layers, lowest priority first: built-in defaults, a TOML file, environment
//! variables, then whatever the caller sets on the struct (the CLI applies its
//! flags last).
//!
//! ```toml
//! base_url = "http://localhost:8080/api"
//! token = "eyJhbGciOi..."
//! poll_interval_ms = 3000
//! connect_timeout_ms = 3000
//! request_timeout_ms = 30000
//! question_timeout_ms = 600000
//! max_rounds = 5
//! conflict_phrases = ["이미 처리 중", "already processing"]
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::RoundtableError;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "roundtable.toml";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Upper bound on rounds per question, matching the server's limit.
pub const DEFAULT_MAX_ROUNDS: u32 = 5;

pub const ENV_BASE_URL: &str = "ROUNDTABLE_BASE_URL";
pub const ENV_TOKEN: &str = "ROUNDTABLE_TOKEN";
pub const ENV_POLL_MS: &str = "ROUNDTABLE_POLL_MS";

/// Runtime configuration shared by the HTTP client and the coordinators.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:8080/api`. No trailing slash.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Interval between authoritative-state polls while a round runs.
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    /// Per-request timeout for everything except question submission.
    pub request_timeout: Duration,
    /// Timeout for `POST /gpt/question`. The server answers only after every
    /// round has run, so this must outlast a full discussion.
    pub question_timeout: Duration,
    pub max_rounds: u32,
    /// Legacy substrings that mark an error as "round already running".
    pub conflict_phrases: Vec<String>,
}

impl ClientConfig {
    /// Defaults aimed at `base_url`.
    ///
    /// - poll_interval: 3 s
    /// - connect_timeout: 3 s
    /// - request_timeout: 30 s
    /// - question_timeout: 10 min
    /// - max_rounds: 5
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            token: None,
            poll_interval: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(30),
            question_timeout: Duration::from_secs(600),
            max_rounds: DEFAULT_MAX_ROUNDS,
            conflict_phrases: vec!["이미 처리 중".to_string(), "already processing".to_string()],
        }
    }

    /// Load defaults, then `path` (or [`DEFAULT_CONFIG_FILE`] when present),
    /// then the process environment.
    ///
    /// # Errors
    /// - [`RoundtableError::Io`] when an explicit `path` cannot be read.
    /// - [`RoundtableError::Config`] when the file is not valid TOML or holds
    ///   out-of-range values.
    pub fn load(path: Option<&Path>) -> Result<Self, RoundtableError> {
        let mut cfg = Self::default();

        let file: Option<PathBuf> = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                p.exists().then_some(p)
            }
        };
        if let Some(file) = file {
            let text = std::fs::read_to_string(&file)?;
            cfg.merge_toml(&text)?;
            debug!(path = %file.display(), "loaded config file");
        }

        cfg.merge_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Overlay the fields present in a TOML document.
    pub fn merge_toml(&mut self, text: &str) -> Result<(), RoundtableError> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| RoundtableError::Config(e.to_string()))?;

        if let Some(url) = file.base_url {
            self.base_url = normalize_base_url(url);
        }
        if let Some(token) = file.token {
            self.token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = positive_millis("poll_interval_ms", ms)?;
        }
        if let Some(ms) = file.connect_timeout_ms {
            self.connect_timeout = positive_millis("connect_timeout_ms", ms)?;
        }
        if let Some(ms) = file.request_timeout_ms {
            self.request_timeout = positive_millis("request_timeout_ms", ms)?;
        }
        if let Some(ms) = file.question_timeout_ms {
            self.question_timeout = positive_millis("question_timeout_ms", ms)?;
        }
        if let Some(max) = file.max_rounds {
            if max == 0 {
                return Err(RoundtableError::Config("max_rounds must be at least 1".into()));
            }
            self.max_rounds = max;
        }
        if let Some(phrases) = file.conflict_phrases {
            self.conflict_phrases = phrases;
        }
        Ok(())
    }

    /// Overlay environment variables, read through `lookup`.
    pub fn merge_env<F>(&mut self, lookup: F) -> Result<(), RoundtableError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = normalize_base_url(url);
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
        if let Some(raw) = lookup(ENV_POLL_MS).filter(|v| !v.is_empty()) {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|_| RoundtableError::Config(format!("{ENV_POLL_MS}={raw} is not a number")))?;
            self.poll_interval = positive_millis(ENV_POLL_MS, ms)?;
        }
        Ok(())
    }

    /// Clamp a requested round count into `1..=max_rounds`.
    pub fn clamp_rounds(&self, rounds: u32) -> u32 {
        rounds.clamp(1, self.max_rounds.max(1))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    token: Option<String>,
    poll_interval_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    question_timeout_ms: Option<u64>,
    max_rounds: Option<u32>,
    conflict_phrases: Option<Vec<String>>,
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn positive_millis(name: &str, ms: u64) -> Result<Duration, RoundtableError> {
    if ms == 0 {
        return Err(RoundtableError::Config(format!("{name} must be greater than zero")));
    }
    Ok(Duration::from_millis(ms))
}
