use std::thread;
use std::time::Duration;

use bluepic_contracts::{GenerateError, GenerationOptions, GenerationResult, ImageData, ImageMetadata};
use tracing::debug;

use crate::config::StudioConfig;
use crate::placeholder::render_placeholder;
use crate::{random_seed, ImageBackend, ProgressFn, ProgressUpdate};

const PROGRESS_STEPS: u32 = 10;

/// Offline backend: paints a gradient placeholder with the prompt on it.
pub struct MockBackend {
    step_delay: Duration,
}

impl MockBackend {
    pub fn new(config: &StudioConfig) -> Self {
        Self {
            step_delay: config.mock_step_delay,
        }
    }
}

impl ImageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        progress: ProgressFn<'_>,
    ) -> Result<GenerationResult, GenerateError> {
        for step in 0..=PROGRESS_STEPS {
            let percent = f64::from(step) * 100.0 / f64::from(PROGRESS_STEPS);
            progress(ProgressUpdate::new(
                percent,
                format!("Generating... {}%", percent.round()),
            ));
            if step < PROGRESS_STEPS && !self.step_delay.is_zero() {
                thread::sleep(self.step_delay);
            }
        }

        let png = render_placeholder(prompt, options.width, options.height)
            .map_err(|err| GenerateError::Render(format!("{err:#}")))?;
        let seed = options.seed.unwrap_or_else(random_seed);
        debug!(seed, bytes = png.len(), "mock placeholder rendered");

        Ok(GenerationResult {
            image: ImageData::from_bytes("image/png", &png),
            source_url: None,
            metadata: ImageMetadata {
                seed: Some(seed),
                width: options.width,
                height: options.height,
                model: None,
                flagged_unsafe: false,
            },
        })
    }
}
