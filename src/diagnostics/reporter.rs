//! Diagnostic reporter that collects and manages diagnostics.

use std::collections::HashMap;

use super::{Diagnostic, MessageKey};
use crate::ast::Position;

/// Collects diagnostics during a compilation.
///
/// Checks never abort: every failure is pushed here and analysis continues,
/// so one pass surfaces as many independent errors as possible.
#[derive(Debug, Default)]
pub struct DiagnosticReporter {
    diagnostics: Vec<Diagnostic>,
    /// Source text per file, used to attach the offending line.
    sources: HashMap<String, Vec<String>>,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register source text so diagnostics in `file` carry their source line.
    pub fn add_source(&mut self, file: &str, source: &str) {
        let lines = source.lines().map(str::to_string).collect();
        self.sources.insert(file.to_string(), lines);
    }

    /// Get a specific line's content
    pub fn get_line(&self, file: &str, line_num: usize) -> Option<&str> {
        let lines = self.sources.get(file)?;
        if line_num == 0 {
            return None;
        }
        lines.get(line_num - 1).map(String::as_str)
    }

    /// Report `key` at `position` with format arguments.
    pub fn report<I, S>(&mut self, key: MessageKey, position: &Position, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut diagnostic = Diagnostic::error(key, position.clone()).with_args(args);
        if let Some(help) = key.help() {
            diagnostic = diagnostic.with_help(help);
        }
        self.add(diagnostic);
    }

    /// Report a diagnostic without format arguments.
    pub fn report_at(&mut self, key: MessageKey, position: &Position) {
        self.report(key, position, std::iter::empty::<String>());
    }

    /// Add a diagnostic, attaching its source line when known.
    pub fn add(&mut self, mut diagnostic: Diagnostic) {
        if diagnostic.source_line.is_none() {
            let line = self
                .get_line(&diagnostic.position.file, diagnostic.position.line)
                .map(str::to_string);
            if let Some(line) = line {
                diagnostic = diagnostic.with_source_line(line);
            }
        }
        self.diagnostics.push(diagnostic);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Get error count
    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// Number of diagnostics recorded so far.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Whether a diagnostic with `key` was recorded.
    pub fn contains(&self, key: MessageKey) -> bool {
        self.diagnostics.iter().any(|d| d.key == key)
    }

    /// Keys of all recorded diagnostics, in report order.
    pub fn keys(&self) -> Vec<MessageKey> {
        self.diagnostics.iter().map(|d| d.key).collect()
    }

    /// Consume and return all diagnostics
    pub fn take_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Get reference to diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
