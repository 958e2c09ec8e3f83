//! Tracing capture for log assertions

use std::io;
use std::sync::{Arc, Mutex};

/// Shared in-memory sink for a fmt subscriber
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a TRACE-level fmt subscriber and return its output.
///
/// The subscriber is scoped to the current thread only.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_logs_collects_events() {
        let ((), output) = capture_logs(|| {
            tracing::info!(label = "builds", "Resolved job runner");
            tracing::trace!("deep detail");
        });
        assert!(output.contains("Resolved job runner"));
        assert!(output.contains("label=\"builds\""));
        assert!(output.contains("deep detail"));
    }
}
