//! Per-request expansion state handed to handlers.
//!
//! A context carries the request's source fragment for error reporting, a
//! collector for non-fatal diagnostics, and a counter for synthesized names
//! that must not collide with anything the site declares.

use crate::errors::{ErrorKind, ErrorReporting, GraftError, SourceContext};
use miette::SourceSpan;

/// Severity of a non-fatal expansion diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Note,
    Warning,
}

/// A non-fatal observation a handler wants surfaced alongside its output.
/// Fatal conditions go through [`GraftError`] instead and abort the request.
#[derive(Debug, Clone)]
pub struct ExpansionDiagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: SourceSpan,
}

/// State for one expansion request. Built by the driver, borrowed mutably by
/// exactly one handler, then read back for diagnostics. Never shared across
/// requests, so handlers stay independent of each other.
#[derive(Debug)]
pub struct ExpansionContext {
    source: SourceContext,
    request: String,
    diagnostics: Vec<ExpansionDiagnostic>,
    fresh_counter: usize,
}

impl ExpansionContext {
    pub fn new(source: SourceContext, request: impl Into<String>) -> Self {
        Self {
            source,
            request: request.into(),
            diagnostics: Vec::new(),
            fresh_counter: 0,
        }
    }

    /// The name the request invoked, e.g. `echo`.
    pub fn request_name(&self) -> &str {
        &self.request
    }

    pub fn source(&self) -> &SourceContext {
        &self.source
    }

    pub fn note(&mut self, message: impl Into<String>, span: SourceSpan) {
        self.diagnostics.push(ExpansionDiagnostic {
            severity: Severity::Note,
            message: message.into(),
            span,
        });
    }

    pub fn warn(&mut self, message: impl Into<String>, span: SourceSpan) {
        self.diagnostics.push(ExpansionDiagnostic {
            severity: Severity::Warning,
            message: message.into(),
            span,
        });
    }

    pub fn diagnostics(&self) -> &[ExpansionDiagnostic] {
        &self.diagnostics
    }

    /// A name that cannot collide with site declarations or with earlier
    /// fresh names of the same request. The registered handlers emit only
    /// names derived from their input, so repeated expansion of their own
    /// output stays stable; this exists for handlers that do need a hidden
    /// helper name.
    pub fn fresh_name(&mut self, base: &str) -> String {
        let serial = self.fresh_counter;
        self.fresh_counter += 1;
        format!("{}_graft_{}", base, serial)
    }
}

impl ErrorReporting for ExpansionContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> GraftError {
        self.source.report(kind, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::unspanned;

    fn test_context() -> ExpansionContext {
        ExpansionContext::new(SourceContext::from_fragment("request:echo", "#echo(a)"), "echo")
    }

    #[test]
    fn fresh_names_are_distinct_and_keep_the_base() {
        let mut ctx = test_context();
        let first = ctx.fresh_name("storage");
        let second = ctx.fresh_name("storage");
        assert_ne!(first, second);
        assert!(first.starts_with("storage_"));
    }

    #[test]
    fn diagnostics_accumulate_in_order() {
        let mut ctx = test_context();
        ctx.note("skipped an untyped binding", unspanned());
        ctx.warn("shadowed name", unspanned());
        let recorded = ctx.diagnostics();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].severity, Severity::Note);
        assert_eq!(recorded[1].severity, Severity::Warning);
    }

    #[test]
    fn reporting_goes_through_the_request_source() {
        let ctx = test_context();
        let error = ctx.missing_argument("echo", unspanned());
        assert_eq!(error.code(), "graft::expand::missing_argument");
    }
}
