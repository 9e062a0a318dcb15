use std::collections::VecDeque;

use serde::Serialize;

use crate::results::{GenerationResult, ImageData, ImageMetadata};

pub const DEFAULT_GALLERY_MAX: usize = 6;
pub const GALLERY_PROMPT_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryEntry {
    pub image: ImageData,
    pub prompt: String,
    pub created_at_ms: i64,
    pub metadata: ImageMetadata,
}

impl GalleryEntry {
    pub fn to_result(&self) -> GenerationResult {
        GenerationResult {
            image: self.image.clone(),
            source_url: None,
            metadata: self.metadata.clone(),
        }
    }
}

/// Most-recent-first list of past results, capped at `max_entries`.
///
/// Lives for the process only.
#[derive(Debug, Clone)]
pub struct EphemeralGallery {
    entries: VecDeque<GalleryEntry>,
    max_entries: usize,
}

impl Default for EphemeralGallery {
    fn default() -> Self {
        Self::new(DEFAULT_GALLERY_MAX)
    }
}

impl EphemeralGallery {
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: VecDeque::with_capacity(max_entries + 1),
            max_entries,
        }
    }

    pub fn record(&mut self, result: &GenerationResult, prompt: &str) -> &GalleryEntry {
        self.record_at(result, prompt, chrono::Utc::now().timestamp_millis())
    }

    pub fn record_at(
        &mut self,
        result: &GenerationResult,
        prompt: &str,
        created_at_ms: i64,
    ) -> &GalleryEntry {
        self.entries.push_front(GalleryEntry {
            image: result.image.clone(),
            prompt: prompt.chars().take(GALLERY_PROMPT_MAX_CHARS).collect(),
            created_at_ms,
            metadata: result.metadata.clone(),
        });
        self.entries.truncate(self.max_entries);
        &self.entries[0]
    }

    pub fn retrieve(&self, index: usize) -> Option<&GalleryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &GalleryEntry> {
        self.entries.iter()
    }
}
