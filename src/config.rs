use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::{Error, Result, DEFAULT_API_BASE};

/// Upper bound of the worker pool.
pub const MAX_WORKERS: usize = 6;

/// How competition data is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Backend JSON API: metadata, athletes and protocol endpoints.
    #[default]
    Api,
    /// Already rendered competition/protocol page HTML.
    Page,
}

/// Delay between two attempts of the same call.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backoff {
    /// Waits `step × attempt`.
    Linear { step_secs: f64 },
    /// Waits `base × 2^(attempt - 1)` plus up to `jitter_secs` of random slack.
    Exponential { base_secs: f64, jitter_secs: f64 },
}

impl Backoff {
    /// Deterministic part of the delay after the failed `attempt` (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let secs = match *self {
            Backoff::Linear { step_secs } => step_secs * attempt as f64,
            Backoff::Exponential { base_secs, .. } => {
                base_secs * 2f64.powi(attempt.saturating_sub(1) as i32)
            }
        };
        Duration::from_secs_f64(secs.max(0.0))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        match *self {
            Backoff::Linear { .. } => base,
            Backoff::Exponential { jitter_secs, .. } => base + random_secs(jitter_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout_secs: f64,
    pub backoff: Backoff,
    /// Random pause of up to this many seconds before every attempt. 0 disables it.
    pub start_jitter_secs: f64,
}

impl RetryPolicy {
    pub fn api() -> Self {
        Self {
            max_attempts: 3,
            timeout_secs: 20.0,
            backoff: Backoff::Linear { step_secs: 0.6 },
            start_jitter_secs: 0.0,
        }
    }

    pub fn page() -> Self {
        Self {
            max_attempts: 3,
            timeout_secs: 60.0,
            backoff: Backoff::Exponential {
                base_secs: 1.0,
                jitter_secs: 0.75,
            },
            start_jitter_secs: 0.4,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }

    pub fn start_jitter(&self) -> Duration {
        random_secs(self.start_jitter_secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::api()
    }
}

fn random_secs(upper: f64) -> Duration {
    if upper <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..=upper))
}

/// Everything one run needs. Built from an optional JSON file and the command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub urls: Vec<String>,
    pub strategy: Strategy,
    /// Pool size; defaults to 6 for the API and 1 for pages.
    pub workers: Option<usize>,
    pub api_base: String,
    /// Defaults to [`RetryPolicy::api`] or [`RetryPolicy::page`] depending on the strategy.
    pub retry: Option<RetryPolicy>,
    /// Replaces the backend's `Empty` category.
    pub empty_category_label: String,
    pub dedup: bool,
    pub report_duplicates: bool,
    /// Retry failed competitions one by one after the pool is done.
    pub rerun_failed: bool,
    pub out_dir: PathBuf,
    /// Explicit output file; skips deriving the name from the title.
    pub output: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            strategy: Strategy::default(),
            workers: None,
            api_base: DEFAULT_API_BASE.to_owned(),
            retry: None,
            empty_category_label: "Open".to_owned(),
            dedup: false,
            report_duplicates: false,
            rerun_failed: false,
            out_dir: PathBuf::from("."),
            output: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn workers(&self) -> usize {
        self.workers.unwrap_or(match self.strategy {
            Strategy::Api => MAX_WORKERS,
            Strategy::Page => 1,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_else(|| match self.strategy {
            Strategy::Api => RetryPolicy::api(),
            Strategy::Page => RetryPolicy::page(),
        })
    }

    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        let workers = self.workers();
        if !(1..=MAX_WORKERS).contains(&workers) {
            return Err(Error::Config(format!(
                "workers must be between 1 and {MAX_WORKERS}, got {workers}"
            )));
        }
        let retry = self.retry_policy();
        if retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if retry.timeout_secs <= 0.0 {
            return Err(Error::Config("retry.timeout_secs must be positive".into()));
        }
        if retry.start_jitter_secs < 0.0 {
            return Err(Error::Config("retry.start_jitter_secs must not be negative".into()));
        }
        if self.strategy == Strategy::Api && self.api_base().is_empty() {
            return Err(Error::Config("api_base is empty".into()));
        }
        Ok(())
    }
}
