pub mod config;
pub mod export;
pub mod placeholder;
pub mod providers;
pub mod studio;

use bluepic_contracts::{GenerateError, GenerationOptions, GenerationResult};
use rand::Rng;
use reqwest::blocking::Client as HttpClient;

pub use config::{BackendKind, StudioConfig};
pub use providers::{JsonBackend, MockBackend, PollinationsBackend};
pub use studio::{GenerateOutcome, GenerationPhase, NoopListener, Studio, StudioListener};

/// A single progress notification: percentage in `0.0..=100.0` plus stage text.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub percent: f64,
    pub stage: String,
}

impl ProgressUpdate {
    pub fn new(percent: f64, stage: impl Into<String>) -> Self {
        Self {
            percent,
            stage: stage.into(),
        }
    }
}

/// Receives progress notifications for the request currently in flight.
pub type ProgressFn<'a> = &'a (dyn Fn(ProgressUpdate) + Send + Sync);

/// One image-generation strategy.
///
/// Implementations do not touch session state: they either return a complete
/// result or an error, and the caller decides what the UI shows.
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &str;
    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        progress: ProgressFn<'_>,
    ) -> Result<GenerationResult, GenerateError>;
}

pub fn build_backend(config: &StudioConfig) -> anyhow::Result<Box<dyn ImageBackend>> {
    let backend: Box<dyn ImageBackend> = match config.backend {
        BackendKind::Pollinations => Box::new(PollinationsBackend::new(config)?),
        BackendKind::Json => Box::new(JsonBackend::new(config)?),
        BackendKind::Mock => Box::new(MockBackend::new(config)),
    };
    Ok(backend)
}

pub(crate) fn http_client(config: &StudioConfig) -> anyhow::Result<HttpClient> {
    let client = HttpClient::builder()
        .timeout(config.request_timeout)
        .user_agent(concat!("bluepic/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Seed in `[0, SEED_SPACE)` for requests that did not pin one.
pub fn random_seed() -> u64 {
    rand::thread_rng().gen_range(0..bluepic_contracts::options::SEED_SPACE)
}

pub(crate) fn network_error(err: reqwest::Error) -> GenerateError {
    GenerateError::Network(error_chain_text(&err, 512))
}

pub(crate) fn error_chain_text(err: &(dyn std::error::Error + 'static), max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(cause) = current {
        let text = cause.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty() && parts.last().map(|last| last != trimmed).unwrap_or(true) {
            parts.push(trimmed.to_string());
        }
        current = cause.source();
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|inner| inner as &(dyn std::error::Error + 'static))
        }
    }

    #[test]
    fn error_chain_text_joins_and_dedupes_causes() {
        let err = Layer(
            "request failed",
            Some(Box::new(Layer(
                "connect refused",
                Some(Box::new(Layer("connect refused", None))),
            ))),
        );
        assert_eq!(
            error_chain_text(&err, 200),
            "request failed | caused by: connect refused"
        );
        assert_eq!(error_chain_text(&err, 7), "request…");
    }

    #[test]
    fn random_seeds_stay_in_range() {
        for _ in 0..1000 {
            assert!(random_seed() < 1_000_000);
        }
    }

    #[test]
    fn build_backend_follows_configured_kind() -> anyhow::Result<()> {
        for kind in BackendKind::ALL {
            let backend = build_backend(&StudioConfig::default().with_backend(kind))?;
            assert_eq!(backend.name(), kind.name());
        }
        Ok(())
    }
}
