use std::io::Cursor;

use anyhow::{Context, Result};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{ImageFormat, Rgb, RgbImage};

pub const PROMPT_MAX_CHARS: usize = 100;
pub const MOCK_CAPTION: &str = "[Mock Preview - Enable Pollinations.AI]";

const GRADIENT_START: (u8, u8, u8) = (0x66, 0x7e, 0xea);
const GRADIENT_END: (u8, u8, u8) = (0x76, 0x4b, 0xa2);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const GLYPH_SIZE: u32 = 8;
const TITLE_SCALE: u32 = 3;
const CAPTION_SCALE: u32 = 2;
const LINE_PITCH: i64 = 40;
const SIDE_MARGIN: u32 = 100;

/// Word-wraps the first 100 characters of `prompt` for a canvas `width` pixels wide.
///
/// A word moves to a new line once the running line would exceed
/// `width - 100`; a single over-long word still gets its own line.
pub fn layout_prompt(prompt: &str, width: u32) -> Vec<String> {
    let visible: String = prompt.chars().take(PROMPT_MAX_CHARS).collect();
    let max_width = width.saturating_sub(SIDE_MARGIN) as u64;
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in visible.split(' ').filter(|word| !word.is_empty()) {
        let candidate = format!("{line}{word} ");
        if text_width(&candidate, TITLE_SCALE) > max_width && !line.is_empty() {
            lines.push(line.trim_end().to_string());
            line = format!("{word} ");
        } else {
            line = candidate;
        }
    }
    lines.push(line.trim_end().to_string());
    lines
}

/// PNG bytes for the mock preview: gradient, wrapped prompt, caption.
pub fn render_placeholder(prompt: &str, width: u32, height: u32) -> Result<Vec<u8>> {
    let width = width.max(1);
    let height = height.max(1);
    let mut canvas = gradient(width, height);

    let center_x = width as i64 / 2;
    let mut y = height as i64 / 2 - LINE_PITCH;
    for line in layout_prompt(prompt, width) {
        draw_centered(&mut canvas, &line, center_x, y, TITLE_SCALE);
        y += LINE_PITCH;
    }
    draw_centered(
        &mut canvas,
        MOCK_CAPTION,
        center_x,
        height as i64 - LINE_PITCH,
        CAPTION_SCALE,
    );

    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("placeholder PNG encode failed")?;
    Ok(bytes)
}

fn gradient(width: u32, height: u32) -> RgbImage {
    let w = width as f64;
    let h = height as f64;
    let length_sq = (w * w + h * h).max(1.0);
    RgbImage::from_fn(width, height, |x, y| {
        let t = ((x as f64 * w + y as f64 * h) / length_sq).clamp(0.0, 1.0);
        Rgb([
            lerp(GRADIENT_START.0, GRADIENT_END.0, t),
            lerp(GRADIENT_START.1, GRADIENT_END.1, t),
            lerp(GRADIENT_START.2, GRADIENT_END.2, t),
        ])
    })
}

fn lerp(from: u8, to: u8, t: f64) -> u8 {
    (from as f64 + (to as f64 - from as f64) * t).round() as u8
}

fn text_width(text: &str, scale: u32) -> u64 {
    text.chars().count() as u64 * (GLYPH_SIZE * scale) as u64
}

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Draws `text` centred horizontally on `center_x` and vertically on `center_y`.
fn draw_centered(canvas: &mut RgbImage, text: &str, center_x: i64, center_y: i64, scale: u32) {
    let advance = (GLYPH_SIZE * scale) as i64;
    let mut origin_x = center_x - text_width(text, scale) as i64 / 2;
    let origin_y = center_y - advance / 2;
    for ch in text.chars() {
        draw_glyph(canvas, glyph(ch), origin_x, origin_y, scale);
        origin_x += advance;
    }
}

fn draw_glyph(canvas: &mut RgbImage, rows: [u8; 8], origin_x: i64, origin_y: i64, scale: u32) {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    let scale = scale as i64;
    for (row_idx, row) in rows.iter().enumerate() {
        for col in 0..GLYPH_SIZE as i64 {
            // bit 0 is the leftmost pixel
            if row & (1 << col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let px = origin_x + col * scale + dx;
                    let py = origin_y + row_idx as i64 * scale + dy;
                    if px >= 0 && py >= 0 && px < width && py < height {
                        canvas.put_pixel(px as u32, py as u32, TEXT_COLOR);
                    }
                }
            }
        }
    }
}
