//! Logger handle passed to every phase and plugin.
//!
//! A [`Logger`] writes status lines through the shared [`OutputManager`], so the
//! run's redaction filter applies, and mirrors them to the `log` facade. Scoped
//! loggers prefix each line with `[scope]` labels such as the plugin and step.

use crate::cli::OutputManager;

/// Scoped status logger
#[derive(Debug, Clone)]
pub struct Logger {
    output: OutputManager,
    prefix: String,
}

impl Logger {
    /// Root logger writing through `output`
    pub fn new(output: OutputManager) -> Self {
        Self {
            output,
            prefix: String::new(),
        }
    }

    /// Child logger with an extra `[label]` prefix
    pub fn scoped(&self, label: &str) -> Self {
        Self {
            output: self.output.clone(),
            prefix: format!("{}[{}] ", self.prefix, label),
        }
    }

    fn line(&self, message: &str) -> String {
        format!("{}{}", self.prefix, message)
    }

    /// Informational line
    pub fn log(&self, message: &str) {
        let line = self.line(message);
        log::info!("{}", self.output.redacted(&line));
        let _ = self.output.info(&line);
    }

    /// Success line
    pub fn success(&self, message: &str) {
        let line = self.line(message);
        log::info!("{}", self.output.redacted(&line));
        let _ = self.output.success(&line);
    }

    /// Warning line
    pub fn warn(&self, message: &str) {
        let line = self.line(message);
        log::warn!("{}", self.output.redacted(&line));
        let _ = self.output.warn(&line);
    }

    /// Error line, always shown
    pub fn error(&self, message: &str) {
        let line = self.line(message);
        log::error!("{}", self.output.redacted(&line));
        self.output.error(&line);
    }

    /// Render markdown to the terminal
    pub fn markdown(&self, text: &str) {
        let _ = self.output.markdown(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_prefix_nests() {
        let logger = Logger::new(OutputManager::new(false, true))
            .scoped("exec")
            .scoped("prepare");
        assert_eq!(logger.line("done"), "[exec] [prepare] done");
    }
}
