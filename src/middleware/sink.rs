//! The logging collaborator.

use tracing::info;

/// Receives the text lines emitted by [`RequestLogger`](super::logging::RequestLogger).
///
/// Every line is informational. Where the line ends up (stdout, a file, a
/// collector) is the sink's business.
pub trait LogSink: Send + Sync + 'static {
    fn info(&self, line: &str);
}

/// Forwards lines to the active `tracing` subscriber under the
/// `sieve::request_log` target, so `RUST_LOG=sieve::request_log=info`
/// selects them.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, line: &str) {
        info!(target: "sieve::request_log", "{line}");
    }
}

/// Collects lines in memory for assertions.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MemorySink(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

#[cfg(test)]
impl MemorySink {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn info(&self, line: &str) {
        self.0.lock().unwrap().push(line.to_owned());
    }
}
