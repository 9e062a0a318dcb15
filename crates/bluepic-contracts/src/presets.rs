use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// Canned prompts offered as starting points.
pub const PROMPT_IDEAS: &[&str] = &[
    "A serene Japanese garden at sunset with cherry blossoms and a koi pond",
    "A futuristic city skyline at night with flying cars and neon signs",
    "A cozy cabin in a snowy forest with warm light glowing from the windows",
    "An astronaut riding a horse across the surface of Mars",
    "A steampunk owl made of brass gears perched on an old library shelf",
    "A bowl of ramen floating in space surrounded by tiny planets",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SizePreset {
    Small,
    #[default]
    Medium,
    Large,
}

impl SizePreset {
    pub const ALL: [SizePreset; 3] = [SizePreset::Small, SizePreset::Medium, SizePreset::Large];

    pub fn name(self) -> &'static str {
        match self {
            SizePreset::Small => "small",
            SizePreset::Medium => "medium",
            SizePreset::Large => "large",
        }
    }

    pub fn base_dimensions(self) -> (u32, u32) {
        match self {
            SizePreset::Small => (512, 512),
            SizePreset::Medium => (1024, 1024),
            SizePreset::Large => (1536, 1536),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Square,
    Classic,
    Wide,
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::Square,
        AspectRatio::Classic,
        AspectRatio::Wide,
        AspectRatio::Portrait,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Classic => "3:2",
            AspectRatio::Wide => "16:9",
            AspectRatio::Portrait => "2:3",
        }
    }

    pub fn parts(self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Classic => (3, 2),
            AspectRatio::Wide => (16, 9),
            AspectRatio::Portrait => (2, 3),
        }
    }

    pub fn ratio(self) -> f64 {
        let (width, height) = self.parts();
        width as f64 / height as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StylePreset {
    Photorealistic,
    Illustration,
    Cyberpunk,
    Anime,
    Minimal,
    Watercolor,
}

impl StylePreset {
    pub const ALL: [StylePreset; 6] = [
        StylePreset::Photorealistic,
        StylePreset::Illustration,
        StylePreset::Cyberpunk,
        StylePreset::Anime,
        StylePreset::Minimal,
        StylePreset::Watercolor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StylePreset::Photorealistic => "photorealistic",
            StylePreset::Illustration => "illustration",
            StylePreset::Cyberpunk => "cyberpunk",
            StylePreset::Anime => "anime",
            StylePreset::Minimal => "minimal",
            StylePreset::Watercolor => "watercolor",
        }
    }

    /// Suffix appended to the prompt, leading separator included.
    pub fn suffix(self) -> &'static str {
        match self {
            StylePreset::Photorealistic => {
                ", photorealistic, highly detailed, 8k, professional photography"
            }
            StylePreset::Illustration => ", digital illustration, artstation trending, concept art",
            StylePreset::Cyberpunk => {
                ", cyberpunk style, neon lights, futuristic, blade runner aesthetic"
            }
            StylePreset::Anime => ", anime style, manga art, cel shaded, studio ghibli quality",
            StylePreset::Minimal => ", minimalist design, clean, simple, flat colors, modern",
            StylePreset::Watercolor => ", watercolor painting, soft colors, artistic, hand-painted",
        }
    }
}

macro_rules! named_preset {
    ($ty:ident, $label:literal) => {
        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let wanted = raw.trim().to_ascii_lowercase();
                if let Some(found) = $ty::ALL.iter().find(|item| item.name() == wanted) {
                    return Ok(*found);
                }
                let known = $ty::ALL
                    .iter()
                    .map(|item| item.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                bail!("unknown {} preset '{}' (expected one of: {known})", $label, raw.trim())
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

named_preset!(SizePreset, "size");
named_preset!(AspectRatio, "aspect ratio");
named_preset!(StylePreset, "style");

/// Final pixel dimensions for a size preset, optionally reshaped by an aspect ratio.
///
/// Wider-than-tall ratios keep the width and derive the height; every other
/// ratio (including 1:1) keeps the height and derives the width.
pub fn resolve_dimensions(size: SizePreset, aspect: Option<AspectRatio>) -> (u32, u32) {
    let (mut width, mut height) = size.base_dimensions();
    if let Some(aspect) = aspect {
        let ratio = aspect.ratio();
        if ratio > 1.0 {
            height = (width as f64 / ratio).round() as u32;
        } else {
            width = (height as f64 * ratio).round() as u32;
        }
    }
    (width.max(1), height.max(1))
}

pub fn compose_prompt(raw: &str, style: Option<StylePreset>) -> String {
    match style {
        Some(style) => format!("{raw}{}", style.suffix()),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medium_widescreen_keeps_width() {
        assert_eq!(
            resolve_dimensions(SizePreset::Medium, Some(AspectRatio::Wide)),
            (1024, 576)
        );
    }

    #[test]
    fn default_size_is_medium() {
        assert_eq!(SizePreset::default(), SizePreset::Medium);
        assert_eq!(resolve_dimensions(SizePreset::default(), None), (1024, 1024));
    }

    #[test]
    fn no_aspect_uses_base_dimensions() {
        for size in SizePreset::ALL {
            assert_eq!(resolve_dimensions(size, None), size.base_dimensions());
        }
    }

    #[test]
    fn branch_selection_holds_for_every_pair() {
        for size in SizePreset::ALL {
            let (base_w, base_h) = size.base_dimensions();
            for aspect in AspectRatio::ALL {
                let (width, height) = resolve_dimensions(size, Some(aspect));
                assert!(width > 0 && height > 0);
                if aspect.ratio() > 1.0 {
                    assert_eq!(width, base_w, "{size} {aspect}");
                } else {
                    assert_eq!(height, base_h, "{size} {aspect}");
                }
            }
        }
    }

    #[test]
    fn portrait_and_classic_round_half_away() {
        assert_eq!(
            resolve_dimensions(SizePreset::Small, Some(AspectRatio::Portrait)),
            (341, 512)
        );
        assert_eq!(
            resolve_dimensions(SizePreset::Large, Some(AspectRatio::Classic)),
            (1536, 1024)
        );
        assert_eq!(
            resolve_dimensions(SizePreset::Small, Some(AspectRatio::Wide)),
            (512, 288)
        );
    }

    #[test]
    fn compose_appends_anime_suffix_verbatim() {
        assert_eq!(
            compose_prompt("a cat", Some(StylePreset::Anime)),
            "a cat, anime style, manga art, cel shaded, studio ghibli quality"
        );
        assert_eq!(compose_prompt("  a cat ", None), "  a cat ");
    }

    #[test]
    fn preset_names_parse_case_insensitively() -> anyhow::Result<()> {
        assert_eq!("Medium".parse::<SizePreset>()?, SizePreset::Medium);
        assert_eq!(" 16:9 ".parse::<AspectRatio>()?, AspectRatio::Wide);
        assert_eq!("WATERCOLOR".parse::<StylePreset>()?, StylePreset::Watercolor);

        let err = "huge".parse::<SizePreset>().unwrap_err().to_string();
        assert_eq!(
            err,
            "unknown size preset 'huge' (expected one of: small, medium, large)"
        );
        Ok(())
    }
}
