use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

/// Append-only writer for the module's `events.jsonl`.
///
/// Each emitted event is one compact JSON object per line carrying `type`,
/// `invocation` and `ts` by default; the caller payload is merged last and
/// wins on key conflicts. Writes are serialized internally so hosts that
/// log from several threads cannot interleave lines.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    invocation: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, invocation: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                invocation: invocation.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn invocation(&self) -> &str {
        &self.inner.invocation
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<()> {
        let mut event = EventPayload::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "invocation".to_string(),
            Value::String(self.inner.invocation.clone()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        event.extend(payload);

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&Value::Object(event))?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
