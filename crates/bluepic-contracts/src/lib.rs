pub mod commands;
pub mod errors;
pub mod events;
pub mod gallery;
pub mod options;
pub mod presets;
pub mod results;

pub use errors::GenerateError;
pub use gallery::{EphemeralGallery, GalleryEntry, DEFAULT_GALLERY_MAX};
pub use options::{GenerationOptions, OptionsRequest};
pub use presets::{compose_prompt, resolve_dimensions, AspectRatio, SizePreset, StylePreset};
pub use results::{GenerationResult, ImageData, ImageMetadata};
