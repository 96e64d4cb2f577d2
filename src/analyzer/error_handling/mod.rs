//! # Error Handling
//!
//! Diagnostics raised during a parse go through an [`ErrorHandler`]. Sources
//! are committed failures (`expected X here`), optional reporting of ordinary
//! top-level failures, and explicit reports from semantic actions.
//!
//! ## Handlers
//!
//! * [`TracingErrorHandler`] is used when the caller supplies none. It emits
//!   every diagnostic as a `tracing` event.
//! * [`CollectingErrorHandler`] keeps diagnostics for later inspection.
//!
//! Each report reaches the handler exactly once.

use std::fmt;

use strum::Display;

use super::input::Input;

/// Where a diagnostic points. Lines and columns are 1-based; columns count
/// code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn locate(input: &dyn Input, offset: usize) -> Self {
        let (mut line, mut column) = (1, 1);
        let mut pos = 0;
        while pos < offset {
            let Some((c, next)) = input.next_char(pos) else {
                break;
            };
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
            pos = next;
        }
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Location,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

pub trait ErrorHandler {
    fn report_error(&mut self, location: Location, message: &str);

    fn report_warning(&mut self, location: Location, message: &str);
}

/// Default handler; forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorHandler;

impl ErrorHandler for TracingErrorHandler {
    fn report_error(&mut self, location: Location, message: &str) {
        tracing::error!(
            target: "attrparse::diagnostics",
            line = location.line,
            column = location.column,
            offset = location.offset,
            "{}",
            message
        );
    }

    fn report_warning(&mut self, location: Location, message: &str) {
        tracing::warn!(
            target: "attrparse::diagnostics",
            line = location.line,
            column = location.column,
            offset = location.offset,
            "{}",
            message
        );
    }
}

/// Keeps every diagnostic it receives.
#[derive(Debug, Clone, Default)]
pub struct CollectingErrorHandler {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl CollectingErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn clear(&mut self) {
        self.errors.clear();
        self.warnings.clear();
    }
}

impl ErrorHandler for CollectingErrorHandler {
    fn report_error(&mut self, location: Location, message: &str) {
        self.errors.push(Diagnostic {
            severity: Severity::Error,
            location,
            message: message.to_string(),
        });
    }

    fn report_warning(&mut self, location: Location, message: &str) {
        self.warnings.push(Diagnostic {
            severity: Severity::Warning,
            location,
            message: message.to_string(),
        });
    }
}

pub(crate) fn dispatch(
    handler: &mut dyn ErrorHandler,
    severity: Severity,
    location: Location,
    message: &str,
) {
    tracing::debug!(target: "attrparse::parse", %severity, %location, text = message, "Diagnostic reported");
    match severity {
        Severity::Error => handler.report_error(location, message),
        Severity::Warning => handler.report_warning(location, message),
    }
}

/// Renders a diagnostic with the offending line and a caret under the column.
pub fn format_diagnostic(input: &dyn Input, diagnostic: &Diagnostic) -> String {
    let mut line_text = String::new();
    let mut line = 1;
    let mut pos = 0;
    while let Some((c, next)) = input.next_char(pos) {
        if c == '\n' {
            if line == diagnostic.location.line {
                break;
            }
            line += 1;
        } else if line == diagnostic.location.line {
            line_text.push(c);
        }
        pos = next;
    }
    let caret = " ".repeat(diagnostic.location.column.saturating_sub(1));
    format!("{diagnostic}:\n{line_text}\n{caret}^")
}
