use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use orion_error::prelude::*;
use serde::Serialize;

use crate::error::{CoreReason, CoreResult};

/// A destination for JSON Lines output records.
pub trait RecordSink: Send + Sync {
    /// Write one already-encoded JSON record.
    fn send(&self, line: &str) -> CoreResult<()>;
}

/// Encode a record as a single JSON line (without the trailing newline).
pub fn encode_record<T: Serialize + ?Sized>(record: &T) -> CoreResult<String> {
    serde_json::to_string(record)
        .map_err(|e| StructError::from(CoreReason::DataFormat).with_detail(e.to_string()))
}

fn sink_error(context: &str, e: impl std::fmt::Display) -> crate::error::CoreError {
    StructError::from(CoreReason::AlertSink).with_detail(format!("{context}: {e}"))
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// Appends records as JSON Lines to a file.
pub struct FileSink {
    path: String,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| sink_error(&format!("create {}", parent.display()), e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| sink_error(&format!("open {}", path.display()), e))?;
        Ok(Self {
            path: path.display().to_string(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl RecordSink for FileSink {
    fn send(&self, line: &str) -> CoreResult<()> {
        let mut w = self
            .writer
            .lock()
            .map_err(|_| sink_error(&self.path, "writer lock poisoned"))?;
        w.write_all(line.as_bytes())
            .and_then(|_| w.write_all(b"\n"))
            .and_then(|_| w.flush())
            .map_err(|e| sink_error(&self.path, e))
    }
}

// ---------------------------------------------------------------------------
// StdoutSink
// ---------------------------------------------------------------------------

/// Writes records to standard output, one per line.
pub struct StdoutSink;

impl RecordSink for StdoutSink {
    fn send(&self, line: &str) -> CoreResult<()> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        writeln!(lock, "{line}")
            .and_then(|_| lock.flush())
            .map_err(|e| sink_error("stdout", e))
    }
}

// ---------------------------------------------------------------------------
// FanOutSink
// ---------------------------------------------------------------------------

/// Broadcasts records to multiple sinks.
///
/// Continues sending to all sinks even if one fails. Returns the first error
/// encountered, if any.
pub struct FanOutSink {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl FanOutSink {
    pub fn new(sinks: Vec<Box<dyn RecordSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for FanOutSink {
    fn send(&self, line: &str) -> CoreResult<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.send(line) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
