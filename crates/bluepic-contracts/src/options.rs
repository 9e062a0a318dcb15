use serde::{Deserialize, Serialize};

use crate::presets::{resolve_dimensions, AspectRatio, SizePreset};

pub const DEFAULT_GUIDANCE: f64 = 7.5;
pub const DEFAULT_STEPS: u32 = 30;
/// Upper bound (exclusive) for seeds picked when the user leaves the seed blank.
pub const SEED_SPACE: u64 = 1_000_000;

/// Raw user selections, before any dimension math.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsRequest {
    pub size: SizePreset,
    pub aspect: Option<AspectRatio>,
    pub seed: Option<u64>,
    pub guidance: f64,
    pub steps: u32,
    pub negative_prompt: String,
}

impl Default for OptionsRequest {
    fn default() -> Self {
        Self {
            size: SizePreset::default(),
            aspect: None,
            seed: None,
            guidance: DEFAULT_GUIDANCE,
            steps: DEFAULT_STEPS,
            negative_prompt: String::new(),
        }
    }
}

impl OptionsRequest {
    pub fn resolve(&self) -> GenerationOptions {
        let (width, height) = resolve_dimensions(self.size, self.aspect);
        GenerationOptions {
            width,
            height,
            seed: self.seed,
            guidance: if self.guidance.is_finite() {
                self.guidance
            } else {
                DEFAULT_GUIDANCE
            },
            steps: self.steps.max(1),
            negative_prompt: self.negative_prompt.trim().to_string(),
        }
    }
}

/// Flat per-request parameters handed to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    pub guidance: f64,
    pub steps: u32,
    #[serde(default)]
    pub negative_prompt: String,
}

impl GenerationOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
