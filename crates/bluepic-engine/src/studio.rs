use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::{bail, Result};
use bluepic_contracts::events::{SessionEvent, SessionEventLog};
use bluepic_contracts::{
    compose_prompt, EphemeralGallery, GenerateError, GenerationOptions, GenerationResult,
    OptionsRequest, StylePreset,
};
use reqwest::blocking::Client as HttpClient;
use tracing::{debug, info, warn};

use crate::config::StudioConfig;
use crate::export::{default_file_name, save_image};
use crate::{build_backend, http_client, random_seed, ImageBackend, ProgressUpdate};

/// Where the studio is in its generate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Idle,
    Validating,
    InFlight,
    Success,
    Failed,
}

/// Presentation hooks. Every method defaults to doing nothing.
///
/// Calls arrive on the thread running the generation, never while the
/// studio holds its state lock.
pub trait StudioListener: Send + Sync {
    fn on_phase(&self, _phase: GenerationPhase) {}
    fn on_progress(&self, _update: &ProgressUpdate) {}
    fn on_result(&self, _result: &GenerationResult) {}
    fn on_error(&self, _message: &str) {}
    fn on_gallery_changed(&self, _gallery: &EphemeralGallery) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl StudioListener for NoopListener {}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOutcome {
    Completed(GenerationResult),
    Failed(GenerateError),
    /// Another generation was in flight; this request was dropped.
    Busy,
    NothingToRegenerate,
}

#[derive(Debug, Clone)]
struct LastRequest {
    raw_prompt: String,
    composed_prompt: String,
    options: GenerationOptions,
}

#[derive(Debug)]
struct SessionState {
    current: Option<GenerationResult>,
    gallery: EphemeralGallery,
    last: Option<LastRequest>,
}

/// One user session: the active backend, the current image and the gallery.
///
/// At most one generation runs at a time; a trigger that arrives while one is
/// in flight returns [`GenerateOutcome::Busy`] without touching the backend.
pub struct Studio {
    backend: Box<dyn ImageBackend>,
    http: HttpClient,
    listener: Arc<dyn StudioListener>,
    events: Option<SessionEventLog>,
    in_flight: AtomicBool,
    state: Mutex<SessionState>,
}

/// Clears the in-flight flag and reports Idle on every exit path.
struct FlightGuard<'a> {
    studio: &'a Studio,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.studio.in_flight.store(false, Ordering::Release);
        self.studio.listener.on_phase(GenerationPhase::Idle);
    }
}

impl Studio {
    pub fn new(config: &StudioConfig, listener: Arc<dyn StudioListener>) -> Result<Self> {
        let backend = build_backend(config)?;
        Self::with_backend(config, backend, listener)
    }

    pub fn with_backend(
        config: &StudioConfig,
        backend: Box<dyn ImageBackend>,
        listener: Arc<dyn StudioListener>,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            http: http_client(config)?,
            listener,
            events: None,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SessionState {
                current: None,
                gallery: EphemeralGallery::new(config.gallery_max),
                last: None,
            }),
        })
    }

    /// Attaches a session event log and records `session_started`.
    pub fn with_events(mut self, events: SessionEventLog) -> Self {
        self.events = Some(events);
        self.emit(SessionEvent::SessionStarted {
            backend: self.backend.name().to_string(),
        });
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn current(&self) -> Option<GenerationResult> {
        self.lock_state().current.clone()
    }

    pub fn gallery(&self) -> EphemeralGallery {
        self.lock_state().gallery.clone()
    }

    /// The prompt as typed for the most recent request, if any.
    pub fn last_prompt(&self) -> Option<String> {
        self.lock_state()
            .last
            .as_ref()
            .map(|last| last.raw_prompt.clone())
    }

    pub fn generate(
        &self,
        prompt: &str,
        style: Option<StylePreset>,
        request: &OptionsRequest,
    ) -> GenerateOutcome {
        let raw_prompt = prompt.trim();
        if raw_prompt.is_empty() {
            let err = GenerateError::empty_prompt();
            // phase changes belong to the request in flight, if any
            let busy = self.is_busy();
            if !busy {
                self.listener.on_phase(GenerationPhase::Validating);
            }
            self.listener.on_error(&err.user_message());
            if !busy {
                self.listener.on_phase(GenerationPhase::Idle);
            }
            return GenerateOutcome::Failed(err);
        }
        let request = LastRequest {
            raw_prompt: raw_prompt.to_string(),
            composed_prompt: compose_prompt(raw_prompt, style),
            options: request.resolve(),
        };
        self.run(request, false)
    }

    /// Re-runs the last request with a fresh random seed.
    pub fn regenerate(&self) -> GenerateOutcome {
        let Some(last) = self.lock_state().last.clone() else {
            return GenerateOutcome::NothingToRegenerate;
        };
        let options = last.options.with_seed(random_seed());
        self.run(
            LastRequest {
                options,
                ..last
            },
            true,
        )
    }

    /// Re-runs the last request unchanged, seed included.
    pub fn retry(&self) -> GenerateOutcome {
        let Some(last) = self.lock_state().last.clone() else {
            return GenerateOutcome::NothingToRegenerate;
        };
        self.run(last, false)
    }

    /// Makes gallery entry `index` (0 = newest) the current image.
    pub fn select_gallery(&self, index: usize) -> Option<GenerationResult> {
        let result = {
            let mut state = self.lock_state();
            let result = state.gallery.retrieve(index)?.to_result();
            state.current = Some(result.clone());
            result
        };
        self.listener.on_result(&result);
        Some(result)
    }

    /// Writes the current image to `path`, or to a timestamped name in the
    /// working directory.
    pub fn save_current(&self, path: Option<&Path>) -> Result<PathBuf> {
        let Some(current) = self.current() else {
            bail!("no image to save yet");
        };
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(default_file_name(chrono::Utc::now())),
        };
        let bytes = save_image(&current.image, &path, &self.http)?;
        info!(path = %path.display(), bytes, "image saved");
        self.emit(SessionEvent::ImageSaved {
            path: path.display().to_string(),
            bytes,
        });
        Ok(path)
    }

    fn run(&self, request: LastRequest, regenerate: bool) -> GenerateOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("generate ignored: request already in flight");
            return GenerateOutcome::Busy;
        }
        let _guard = FlightGuard { studio: self };

        self.listener.on_phase(GenerationPhase::Validating);
        self.listener.on_phase(GenerationPhase::InFlight);
        self.lock_state().last = Some(request.clone());
        self.listener
            .on_progress(&ProgressUpdate::new(0.0, "Preparing..."));

        let options = &request.options;
        self.emit(SessionEvent::GenerationStarted {
            prompt: request.raw_prompt.clone(),
            width: options.width,
            height: options.height,
            seed: options.seed,
            steps: options.steps,
            guidance: options.guidance,
            regenerate,
        });
        debug!(
            backend = self.backend.name(),
            prompt = %request.composed_prompt,
            width = options.width,
            height = options.height,
            "generation started"
        );

        let started = Instant::now();
        let listener = &self.listener;
        let forward = move |update: ProgressUpdate| listener.on_progress(&update);
        let outcome = self
            .backend
            .generate(&request.composed_prompt, options, &forward);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                let gallery = {
                    let mut state = self.lock_state();
                    state.current = Some(result.clone());
                    state.gallery.record(&result, &request.raw_prompt);
                    state.gallery.clone()
                };
                info!(
                    backend = self.backend.name(),
                    seed = ?result.metadata.seed,
                    elapsed_ms,
                    "generation completed"
                );
                self.emit(SessionEvent::GenerationCompleted {
                    seed: result.metadata.seed,
                    width: result.metadata.width,
                    height: result.metadata.height,
                    model: result.metadata.model.clone(),
                    elapsed_ms,
                });
                self.emit(SessionEvent::GalleryRecorded {
                    prompt: request.raw_prompt.clone(),
                    gallery_len: gallery.len(),
                });
                self.listener.on_phase(GenerationPhase::Success);
                self.listener.on_result(&result);
                self.listener.on_gallery_changed(&gallery);
                GenerateOutcome::Completed(result)
            }
            Err(err) => {
                warn!(
                    backend = self.backend.name(),
                    kind = err.kind(),
                    elapsed_ms,
                    "generation failed: {err}"
                );
                self.emit(SessionEvent::GenerationFailed {
                    kind: err.kind().to_string(),
                    error: err.to_string(),
                    elapsed_ms,
                });
                self.listener.on_phase(GenerationPhase::Failed);
                self.listener.on_error(&err.user_message());
                GenerateOutcome::Failed(err)
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            if let Err(err) = events.emit(&event) {
                warn!("event log write failed: {err:#}");
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
