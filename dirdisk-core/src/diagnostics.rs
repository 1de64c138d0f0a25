//! Diagnostics sink for warnings raised while keeping the disk in sync.
//!
//! The engine never fails across the sector boundary; anything that goes
//! wrong is reported here as a human-readable warning instead.

/// Receiver for engine warnings.
pub trait Diagnostics: Send {
    /// Report a warning.
    fn warn(&mut self, message: &str);
}

/// Forwards warnings to the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn warn(&mut self, message: &str) {
        log::warn!("{}", message);
    }
}

/// Headless sink for testing - keeps every warning in order.
#[derive(Debug, Default, Clone)]
pub struct CollectedWarnings {
    messages: Vec<String>,
}

impl CollectedWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// All warnings received so far.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Check if any warning contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.contains(needle))
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop recorded warnings.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Diagnostics for CollectedWarnings {
    fn warn(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collected_warnings() {
        let mut sink = CollectedWarnings::new();
        assert!(sink.is_empty());

        sink.warn("directory full: host file X.TXT not added");
        sink.warn("second");
        assert_eq!(sink.messages().len(), 2);
        assert!(sink.contains("directory full"));
        assert!(!sink.contains("disk full"));

        sink.clear();
        assert!(sink.is_empty());
    }
}
