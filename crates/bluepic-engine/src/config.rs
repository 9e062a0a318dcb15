use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bluepic_contracts::DEFAULT_GALLERY_MAX;

pub const DEFAULT_POLLINATIONS_API: &str = "https://image.pollinations.ai/prompt/";
pub const DEFAULT_API_ENDPOINT: &str = "http://127.0.0.1:3000/api/generate";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_PROGRESS_PAUSE: Duration = Duration::from_millis(500);
pub const DEFAULT_MOCK_STEP_DELAY: Duration = Duration::from_millis(200);

/// Which backend strategy a studio talks to. Chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BackendKind {
    #[default]
    Pollinations,
    Json,
    Mock,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Pollinations,
        BackendKind::Json,
        BackendKind::Mock,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Pollinations => "pollinations",
            BackendKind::Json => "json",
            BackendKind::Mock => "mock",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pollinations" | "public" => Ok(BackendKind::Pollinations),
            "json" | "custom" | "api" => Ok(BackendKind::Json),
            "mock" | "dryrun" => Ok(BackendKind::Mock),
            other => bail!("unknown backend '{other}' (expected pollinations, json or mock)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    pub backend: BackendKind,
    /// Prefix the encoded prompt is appended to.
    pub pollinations_api: String,
    pub pollinations_model: String,
    pub pollinations_label: String,
    pub api_endpoint: String,
    pub gallery_max: usize,
    pub request_timeout: Duration,
    /// Pause between the 90% and 100% progress updates of the public service.
    pub progress_pause: Duration,
    pub mock_step_delay: Duration,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            pollinations_api: DEFAULT_POLLINATIONS_API.to_string(),
            pollinations_model: "flux".to_string(),
            pollinations_label: "Pollinations.AI Flux".to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            gallery_max: DEFAULT_GALLERY_MAX,
            request_timeout: DEFAULT_TIMEOUT,
            progress_pause: DEFAULT_PROGRESS_PAUSE,
            mock_step_delay: DEFAULT_MOCK_STEP_DELAY,
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with any non-blank `BLUEPIC_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_overrides(non_empty_env)
    }

    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("BLUEPIC_BACKEND") {
            self.backend = value.parse().context("BLUEPIC_BACKEND")?;
        }
        if let Some(value) = lookup("BLUEPIC_POLLINATIONS_API") {
            self.pollinations_api = value;
        }
        if let Some(value) = lookup("BLUEPIC_API_ENDPOINT") {
            self.api_endpoint = value;
        }
        if let Some(value) = lookup("BLUEPIC_GALLERY_MAX") {
            self.gallery_max = parse_positive("BLUEPIC_GALLERY_MAX", &value)? as usize;
        }
        if let Some(value) = lookup("BLUEPIC_TIMEOUT_SECS") {
            self.request_timeout =
                Duration::from_secs(parse_positive("BLUEPIC_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = lookup("BLUEPIC_PROGRESS_PAUSE_MS") {
            self.progress_pause =
                Duration::from_millis(parse_millis("BLUEPIC_PROGRESS_PAUSE_MS", &value)?);
        }
        if let Some(value) = lookup("BLUEPIC_MOCK_STEP_MS") {
            self.mock_step_delay =
                Duration::from_millis(parse_millis("BLUEPIC_MOCK_STEP_MS", &value)?);
        }
        Ok(self)
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into();
        self
    }

    pub fn with_pollinations_api(mut self, base: impl Into<String>) -> Self {
        self.pollinations_api = base.into();
        self
    }

    /// Zero pacing delays; used by tests and scripted runs.
    pub fn without_pacing(mut self) -> Self {
        self.progress_pause = Duration::ZERO;
        self.mock_step_delay = Duration::ZERO;
        self
    }

    pub fn status_line(&self) -> String {
        match self.backend {
            BackendKind::Pollinations => {
                format!("Using Pollinations.AI ({})", self.pollinations_api)
            }
            BackendKind::Json => format!("Using custom API: {}", self.api_endpoint),
            BackendKind::Mock => "Running in MOCK mode".to_string(),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => bail!("{key} must be a positive integer, got '{raw}'"),
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of milliseconds, got '{raw}'"))
}
