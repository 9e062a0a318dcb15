use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        backend: String,
    },
    GenerationStarted {
        prompt: String,
        width: u32,
        height: u32,
        seed: Option<u64>,
        steps: u32,
        guidance: f64,
        regenerate: bool,
    },
    GenerationCompleted {
        seed: Option<u64>,
        width: u32,
        height: u32,
        model: Option<String>,
        elapsed_ms: u64,
    },
    GenerationFailed {
        kind: String,
        error: String,
        elapsed_ms: u64,
    },
    GalleryRecorded {
        prompt: String,
        gallery_len: usize,
    },
    ImageSaved {
        path: String,
        bytes: usize,
    },
}

/// Append-only writer for a session's `events.jsonl`.
///
/// Every line carries `type`, `session_id` and `ts` plus the event's own
/// fields, one compact JSON object per line.
#[derive(Debug, Clone)]
pub struct SessionEventLog {
    inner: Arc<EventLogInner>,
}

#[derive(Debug)]
struct EventLogInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl SessionEventLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventLogInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn with_random_id(path: impl Into<PathBuf>) -> Self {
        Self::new(path, uuid::Uuid::new_v4().to_string())
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, event: &SessionEvent) -> anyhow::Result<Value> {
        let mut line = Map::new();
        if let Value::Object(fields) = serde_json::to_value(event)? {
            line.extend(fields);
        }
        line.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        line.insert("ts".to_string(), Value::String(now_utc_iso()));

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let encoded = serde_json::to_string(&line)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(encoded.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(line))
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
