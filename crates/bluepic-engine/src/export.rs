use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bluepic_contracts::ImageData;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;

/// `bluepic_2024-05-01T13-45-09.png` style name for a download taken at `now`.
pub fn default_file_name(now: DateTime<Utc>) -> String {
    format!("bluepic_{}.png", now.format("%Y-%m-%dT%H-%M-%S"))
}

/// Raw bytes behind `image`; remote references are fetched.
pub fn image_bytes(image: &ImageData, http: &HttpClient) -> Result<Vec<u8>> {
    match image {
        ImageData::Inline { .. } => image.decode_inline(),
        ImageData::Remote { url } => {
            let response = http
                .get(url)
                .send()
                .with_context(|| format!("download failed for {url}"))?
                .error_for_status()
                .with_context(|| format!("download failed for {url}"))?;
            let bytes = response
                .bytes()
                .with_context(|| format!("download body read failed for {url}"))?;
            Ok(bytes.to_vec())
        }
    }
}

/// Writes `image` to `path`, creating parent directories. Returns bytes written.
pub fn save_image(image: &ImageData, path: &Path, http: &HttpClient) -> Result<usize> {
    let bytes = image_bytes(image, http)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(bytes.len())
}
