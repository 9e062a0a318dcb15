use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL_LABEL: &str = "Pollinations.AI";

/// Displayable image: either embedded bytes or a reference the viewer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageData {
    Inline { mime_type: String, base64: String },
    Remote { url: String },
}

impl ImageData {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        ImageData::Inline {
            mime_type: mime_type.into(),
            base64: BASE64.encode(bytes),
        }
    }

    /// Accepts `data:<mime>;base64,<payload>`; anything else is rejected.
    pub fn parse_data_url(raw: &str) -> Option<Self> {
        let rest = raw.trim().strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        if payload.is_empty() {
            return None;
        }
        Some(ImageData::Inline {
            mime_type: if mime_type.is_empty() {
                "image/png".to_string()
            } else {
                mime_type.to_string()
            },
            base64: payload.to_string(),
        })
    }

    /// String a viewer can load directly (`data:` URL or remote URL).
    pub fn src(&self) -> String {
        match self {
            ImageData::Inline { mime_type, base64 } => format!("data:{mime_type};base64,{base64}"),
            ImageData::Remote { url } => url.clone(),
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            ImageData::Inline { mime_type, .. } => Some(mime_type.as_str()),
            ImageData::Remote { .. } => None,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ImageData::Inline { .. })
    }

    pub fn decode_inline(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            ImageData::Inline { base64, .. } => BASE64
                .decode(base64.as_bytes())
                .context("inline image base64 decode failed"),
            ImageData::Remote { url } => bail!("image is a remote reference ({url})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub seed: Option<u64>,
    pub width: u32,
    pub height: u32,
    pub model: Option<String>,
    #[serde(default)]
    pub flagged_unsafe: bool,
}

impl ImageMetadata {
    pub fn summary_line(&self) -> String {
        let seed = self
            .seed
            .map(|seed| seed.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        format!(
            "Size: {}×{}px | Seed: {} | Model: {}",
            self.width,
            self.height,
            seed,
            self.model.as_deref().unwrap_or(DEFAULT_MODEL_LABEL)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub image: ImageData,
    /// Where the image came from, when it can be fetched again.
    pub source_url: Option<String>,
    pub metadata: ImageMetadata,
}
