use fd_config::InputSource;
use fd_core::alert::RecordSink;
use orion_error::prelude::*;
use tokio::task::JoinHandle;

use crate::error::{RuntimeReason, RuntimeResult};

// ---------------------------------------------------------------------------
// TaskGroup
// ---------------------------------------------------------------------------

/// A named group of async tasks that are shut down together.
///
/// Groups are assembled in start order and joined in reverse (LIFO):
///
///   start:  metrics → outputs → partitions → source
///   join:   source → partitions → outputs → metrics
///
/// Producers exit before their consumers, so every record in flight reaches
/// a sink before the engine stops.
pub(crate) struct TaskGroup {
    pub(super) name: &'static str,
    handles: Vec<JoinHandle<RuntimeResult<()>>>,
}

impl TaskGroup {
    pub(super) fn new(name: &'static str) -> Self {
        Self {
            name,
            handles: Vec::new(),
        }
    }

    pub(super) fn push(&mut self, handle: JoinHandle<RuntimeResult<()>>) {
        self.handles.push(handle);
    }

    pub(super) fn len(&self) -> usize {
        self.handles.len()
    }

    /// Join every task in this group and return the first error. A failed
    /// task does not stop the remaining ones from being joined.
    pub(super) async fn wait(self) -> RuntimeResult<()> {
        let mut first_err = None;
        for handle in self.handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => StructError::from(RuntimeReason::Shutdown)
                    .with_detail(format!("task join error: {e}"))
                    .err(),
            };
            if let Err(e) = result {
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
// BootstrapData
// ---------------------------------------------------------------------------

/// Resources opened during bootstrap, before any task is spawned.
pub(super) struct BootstrapData {
    pub input: InputSource,
    pub alert_sink: Box<dyn RecordSink>,
    pub current_rule_sink: Box<dyn RecordSink>,
    pub latency_sink: Box<dyn RecordSink>,
}
