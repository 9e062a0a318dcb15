use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use bluepic_contracts::{GenerateError, GenerationOptions, GenerationResult, ImageData, ImageMetadata};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};
use url::Url;

use super::image_mime_type;
use crate::config::StudioConfig;
use crate::{
    http_client, network_error, random_seed, truncate_text, ImageBackend, ProgressFn,
    ProgressUpdate,
};

/// Free public text-to-image endpoint: GET `{base}/{prompt}?width=..&height=..`.
pub struct PollinationsBackend {
    api_base: Url,
    model: String,
    label: String,
    pause: Duration,
    http: HttpClient,
}

impl PollinationsBackend {
    pub fn new(config: &StudioConfig) -> anyhow::Result<Self> {
        let api_base = Url::parse(config.pollinations_api.trim())
            .with_context(|| format!("invalid Pollinations API base '{}'", config.pollinations_api))?;
        if api_base.cannot_be_a_base() {
            bail!("Pollinations API base '{}' cannot take a path", config.pollinations_api);
        }
        Ok(Self {
            api_base,
            model: config.pollinations_model.clone(),
            label: config.pollinations_label.clone(),
            pause: config.progress_pause,
            http: http_client(config)?,
        })
    }

    /// Full request URL for `prompt`; the prompt becomes one percent-encoded path segment.
    pub fn request_url(&self, prompt: &str, options: &GenerationOptions, seed: u64) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(prompt);
        }
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("width", &options.width.to_string())
                .append_pair("height", &options.height.to_string())
                .append_pair("seed", &seed.to_string())
                .append_pair("model", &self.model)
                .append_pair("nologo", "true")
                .append_pair("enhance", "true");
            if !options.negative_prompt.is_empty() {
                query.append_pair("negative", &options.negative_prompt);
            }
        }
        url
    }
}

impl ImageBackend for PollinationsBackend {
    fn name(&self) -> &str {
        "pollinations"
    }

    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        progress: ProgressFn<'_>,
    ) -> Result<GenerationResult, GenerateError> {
        progress(ProgressUpdate::new(10.0, "Connecting to Pollinations.AI..."));
        let seed = options.seed.unwrap_or_else(random_seed);
        let url = self.request_url(prompt, options, seed);
        debug!(%url, "pollinations request");

        progress(ProgressUpdate::new(30.0, "Sending request..."));
        let started = Instant::now();
        let response = self.http.get(url.as_str()).send().map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerateError::Backend {
                status: status.as_u16(),
                detail: truncate_text(&body, 512),
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        progress(ProgressUpdate::new(60.0, "Generating image..."));
        let bytes = response.bytes().map_err(network_error)?;
        let mime_type = image_mime_type(content_type.as_deref(), &bytes)?;

        progress(ProgressUpdate::new(90.0, "Finalizing..."));
        if !self.pause.is_zero() {
            thread::sleep(self.pause);
        }
        progress(ProgressUpdate::new(100.0, "Complete!"));
        info!(
            seed,
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pollinations image received"
        );

        Ok(GenerationResult {
            image: ImageData::from_bytes(mime_type, &bytes),
            source_url: Some(url.to_string()),
            metadata: ImageMetadata {
                seed: Some(seed),
                width: options.width,
                height: options.height,
                model: Some(self.label.clone()),
                flagged_unsafe: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::{recorder, serve_once, tiny_png};

    fn options(seed: Option<u64>, negative: &str) -> GenerationOptions {
        GenerationOptions {
            width: 1024,
            height: 576,
            seed,
            guidance: 7.5,
            steps: 30,
            negative_prompt: negative.to_string(),
        }
    }

    fn backend_for(base: &str) -> anyhow::Result<PollinationsBackend> {
        PollinationsBackend::new(
            &StudioConfig::default()
                .with_pollinations_api(base)
                .without_pacing(),
        )
    }

    #[test]
    fn request_url_encodes_prompt_and_parameters() -> anyhow::Result<()> {
        let backend = backend_for("https://image.pollinations.ai/prompt/")?;
        let url = backend.request_url("a cat/dog & friends", &options(Some(42), ""), 42);
        assert_eq!(
            url.as_str(),
            "https://image.pollinations.ai/prompt/a%20cat%2Fdog%20&%20friends\
             ?width=1024&height=576&seed=42&model=flux&nologo=true&enhance=true"
        );
        Ok(())
    }

    #[test]
    fn negative_prompt_is_only_sent_when_present() -> anyhow::Result<()> {
        let backend = backend_for("https://image.pollinations.ai/prompt/")?;
        let with = backend.request_url("cat", &options(None, "blurry text"), 7);
        assert_eq!(
            with.query(),
            Some("width=1024&height=576&seed=7&model=flux&nologo=true&enhance=true&negative=blurry+text")
        );
        let without = backend.request_url("cat", &options(None, ""), 7);
        assert!(!without.as_str().contains("negative"));
        Ok(())
    }

    #[test]
    fn generate_inlines_image_and_reports_staged_progress() -> anyhow::Result<()> {
        let png = tiny_png();
        let (base, server) = serve_once(200, "image/png", png.clone());
        let backend = backend_for(&format!("{base}/prompt/"))?;
        let (seen, sink) = recorder();

        let result = backend
            .generate("a red fox", &options(Some(99), ""), &sink)
            .map_err(anyhow::Error::new)?;

        let captured = server.join().ok().flatten().context("no request captured")?;
        assert_eq!(captured.method, "GET");
        assert!(captured.url.starts_with("/prompt/a%20red%20fox?width=1024&height=576&seed=99"));

        assert_eq!(result.image.mime_type(), Some("image/png"));
        assert_eq!(result.image.decode_inline()?, png);
        assert_eq!(result.source_url.as_deref().map(|url| url.contains("seed=99")), Some(true));
        assert_eq!(result.metadata.seed, Some(99));
        assert_eq!((result.metadata.width, result.metadata.height), (1024, 576));
        assert_eq!(result.metadata.model.as_deref(), Some("Pollinations.AI Flux"));
        assert!(!result.metadata.flagged_unsafe);

        let percents: Vec<f64> = seen.lock().unwrap().iter().map(|update| update.percent).collect();
        assert_eq!(percents, vec![10.0, 30.0, 60.0, 90.0, 100.0]);
        Ok(())
    }

    #[test]
    fn missing_seed_is_generated_and_echoed() -> anyhow::Result<()> {
        let (base, server) = serve_once(200, "image/png", tiny_png());
        let backend = backend_for(&format!("{base}/prompt/"))?;
        let (_, sink) = recorder();

        let result = backend
            .generate("cat", &options(None, ""), &sink)
            .map_err(anyhow::Error::new)?;
        let captured = server.join().ok().flatten().context("no request captured")?;

        let seed = result.metadata.seed.context("seed missing")?;
        assert!(seed < 1_000_000);
        assert!(captured.url.contains(&format!("seed={seed}&")));
        Ok(())
    }

    #[test]
    fn error_status_becomes_backend_error() -> anyhow::Result<()> {
        let (base, server) = serve_once(502, "text/plain", b"upstream down".to_vec());
        let backend = backend_for(&format!("{base}/prompt/"))?;
        let (seen, sink) = recorder();

        let err = backend.generate("cat", &options(Some(1), ""), &sink).unwrap_err();
        let _ = server.join();
        assert_eq!(
            err,
            GenerateError::Backend {
                status: 502,
                detail: "upstream down".to_string()
            }
        );
        assert_eq!(seen.lock().unwrap().last().map(|update| update.percent), Some(30.0));
        Ok(())
    }

    #[test]
    fn unreachable_host_is_a_network_error() -> anyhow::Result<()> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);
        let backend = backend_for(&format!("http://{addr}/prompt/"))?;
        let (_, sink) = recorder();

        let err = backend.generate("cat", &options(Some(1), ""), &sink).unwrap_err();
        assert_eq!(err.kind(), "network");
        assert!(err.is_retryable());
        Ok(())
    }
}
