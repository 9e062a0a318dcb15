use std::time::Instant;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bluepic_contracts::{GenerateError, GenerationOptions, GenerationResult, ImageData, ImageMetadata};
use reqwest::blocking::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::StudioConfig;
use crate::{http_client, network_error, truncate_text, ImageBackend, ProgressFn};

/// Self-hosted backend speaking a small JSON contract over POST.
pub struct JsonBackend {
    endpoint: Url,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    width: u32,
    height: u32,
    steps: u32,
    seed: Option<u64>,
    guidance: f64,
}

impl JsonBackend {
    pub fn new(config: &StudioConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(config.api_endpoint.trim())
            .with_context(|| format!("invalid API endpoint '{}'", config.api_endpoint))?;
        Ok(Self {
            endpoint,
            http: http_client(config)?,
        })
    }
}

impl ImageBackend for JsonBackend {
    fn name(&self) -> &str {
        "json"
    }

    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        _progress: ProgressFn<'_>,
    ) -> Result<GenerationResult, GenerateError> {
        let payload = GenerateRequest {
            prompt,
            negative_prompt: &options.negative_prompt,
            width: options.width,
            height: options.height,
            steps: options.steps,
            seed: options.seed,
            guidance: options.guidance,
        };
        debug!(endpoint = %self.endpoint, "json backend request");

        let started = Instant::now();
        let response = self
            .http
            .post(self.endpoint.as_str())
            .json(&payload)
            .send()
            .map_err(network_error)?;
        let status = response.status();
        let body = response.text().map_err(network_error)?;
        if !status.is_success() {
            return Err(GenerateError::Backend {
                status: status.as_u16(),
                detail: truncate_text(body.trim(), 512),
            });
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|err| {
            GenerateError::InvalidResponse(format!(
                "{err} (body: {})",
                truncate_text(body.trim(), 200)
            ))
        })?;
        let result = result_from_response(&parsed, options)?;
        info!(
            seed = ?result.metadata.seed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "json backend image received"
        );
        Ok(result)
    }
}

/// Maps `{image_base64 | image_url, meta: {...}}` onto a result.
fn result_from_response(
    response: &Value,
    options: &GenerationOptions,
) -> Result<GenerationResult, GenerateError> {
    let meta = response.get("meta").cloned().unwrap_or(Value::Null);
    if truthy(meta.get("nsfw")) {
        warn!("json backend flagged the image as unsafe");
        return Err(GenerateError::ContentFiltered);
    }

    let image_url = non_empty_str(response.get("image_url"));
    let (image, source_url) = match non_empty_str(response.get("image_base64")) {
        Some(raw) => (inline_image(&raw)?, image_url),
        None => match image_url {
            Some(url) => (ImageData::Remote { url: url.clone() }, Some(url)),
            None => {
                return Err(GenerateError::InvalidResponse(
                    "response has neither image_base64 nor image_url".to_string(),
                ))
            }
        },
    };

    let metadata = ImageMetadata {
        seed: meta.get("seed").and_then(as_u64).or(options.seed),
        width: meta
            .get("width")
            .and_then(as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(options.width),
        height: meta
            .get("height")
            .and_then(as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(options.height),
        model: non_empty_str(meta.get("model")),
        flagged_unsafe: false,
    };
    Ok(GenerationResult {
        image,
        source_url,
        metadata,
    })
}

/// A `data:` URL keeps its type; bare base64 is taken as PNG.
fn inline_image(raw: &str) -> Result<ImageData, GenerateError> {
    let image = if raw.starts_with("data:") {
        ImageData::parse_data_url(raw).ok_or_else(|| {
            GenerateError::InvalidResponse("image_base64 is not a base64 data URL".to_string())
        })?
    } else {
        ImageData::Inline {
            mime_type: "image/png".to_string(),
            base64: raw.to_string(),
        }
    };
    if let ImageData::Inline { base64, .. } = &image {
        BASE64.decode(base64.as_bytes()).map_err(|err| {
            GenerateError::InvalidResponse(format!("image_base64 does not decode: {err}"))
        })?;
    }
    Ok(image)
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(number)) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        _ => false,
    }
}
