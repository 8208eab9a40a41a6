use log::{error, info};
use parking_lot::Mutex;
use std::sync::Arc;

/// Append-only sink of human readable progress and error lines.
///
/// Clones share the same log. Every line also goes through the `log` facade.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    inner: Arc<Mutex<DiagnosticLines>>,
}

#[derive(Debug, Default)]
struct DiagnosticLines {
    lines: Vec<String>,
    last_error: Option<String>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        info!("{}", line);
        self.inner.lock().lines.push(line);
    }

    pub fn error(&self, line: impl Into<String>) {
        let line = line.into();
        error!("{}", line);
        let mut inner = self.inner.lock();
        inner.lines.push(format!("error: {}", line));
        inner.last_error = Some(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }
}
