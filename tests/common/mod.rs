//! Shared utilities for integration tests.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Error returned by the test operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("backend {backend} unavailable (attempt {attempt})")]
pub struct Unavailable {
    pub backend: &'static str,
    pub attempt: u32,
}

/// Operation that fails every time and counts its invocations.
#[allow(dead_code)]
pub fn always_failing(calls: Arc<AtomicU32>) -> impl FnMut(&'static str) -> Result<(), Unavailable> {
    move |backend| {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Err(Unavailable { backend, attempt })
    }
}

/// Collects formatted log output in memory.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
