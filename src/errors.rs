//! Graft Error Handling - Unified Encapsulated API
//!
//! Every failure in the engine surfaces as a [`GraftError`] value carried back
//! to the driver boundary. A malformed request never aborts the process.

use miette::{Diagnostic, SourceSpan};
use miette::{LabeledSpan, NamedSource};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source context for error reporting: the fragment text a request carried,
/// under the name the host gave it.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from the text of a request fragment.
    /// This is the preferred method for error reporting.
    pub fn from_fragment(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when no fragment text is available.
    /// Use only when real source cannot be obtained.
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("// {}", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting.
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

/// The single error type - no wrapper, no variants, just essential data
#[derive(Debug)]
pub struct GraftError {
    /// What went wrong (type-specific data)
    pub kind: ErrorKind,
    /// Where it happened (the request fragment and the offending span)
    pub source_info: SourceInfo,
    /// How to help (auto-populated based on the kind)
    pub diagnostic_info: DiagnosticInfo,
}

/// All error types as a clean enum - no duplicate fields
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Parse errors - the request text does not form the construct it claims
    #[error("Parse error: malformed {construct}: {detail}")]
    MalformedSyntax { construct: String, detail: String },

    // Dispatch errors - registry misuse, fatal to the single request
    #[error("Dispatch error: a transformation named '{name}' is already registered")]
    DuplicateName { name: String },
    #[error("Dispatch error: no transformation named '{name}' is registered")]
    UnknownTransformation { name: String },
    #[error("Dispatch error: '{request}' expands as {declared}, but the request supplied {supplied}")]
    KindMismatch {
        request: String,
        declared: String,
        supplied: String,
    },

    // Expansion errors - handler validation failures, reportable at the site
    #[error("Expansion error: '{request}' requires an argument")]
    MissingArgument { request: String },
    #[error("Expansion error: '{request}' requires a string literal without interpolation")]
    ArgumentNotStringLiteral { request: String },
    #[error("Expansion error: '{request}' requires an integer constant: {detail}")]
    NotAnInteger { request: String, detail: String },
    #[error("Expansion error: binding '{binding}' has no type annotation")]
    MissingTypeAnnotation { binding: String },
    #[error("Expansion error: binding '{binding}' must be optional, found '{annotation}'")]
    RequiresOptionalType { binding: String, annotation: String },
    #[error("Expansion error: '{request}' expects {expected}, but was attached to {found}")]
    InvalidSite {
        request: String,
        expected: String,
        found: String,
    },
}

/// Context-specific source information
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub stage: ErrorCategory,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

/// Context-aware error creation - each context knows how to create appropriate errors
pub trait ErrorReporting {
    /// Create an error with context-appropriate enhancements
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> GraftError;

    /// Convenience methods for common error types
    fn malformed_syntax(&self, construct: &str, detail: &str, span: SourceSpan) -> GraftError {
        self.report(
            ErrorKind::MalformedSyntax {
                construct: construct.into(),
                detail: detail.into(),
            },
            span,
        )
    }

    fn unknown_transformation(&self, name: &str, span: SourceSpan) -> GraftError {
        self.report(ErrorKind::UnknownTransformation { name: name.into() }, span)
    }

    fn kind_mismatch(
        &self,
        request: &str,
        declared: &str,
        supplied: &str,
        span: SourceSpan,
    ) -> GraftError {
        self.report(
            ErrorKind::KindMismatch {
                request: request.into(),
                declared: declared.into(),
                supplied: supplied.into(),
            },
            span,
        )
    }

    fn missing_argument(&self, request: &str, span: SourceSpan) -> GraftError {
        self.report(
            ErrorKind::MissingArgument {
                request: request.into(),
            },
            span,
        )
    }

    fn argument_not_string_literal(&self, request: &str, span: SourceSpan) -> GraftError {
        self.report(
            ErrorKind::ArgumentNotStringLiteral {
                request: request.into(),
            },
            span,
        )
    }

    fn not_an_integer(&self, request: &str, detail: &str, span: SourceSpan) -> GraftError {
        self.report(
            ErrorKind::NotAnInteger {
                request: request.into(),
                detail: detail.into(),
            },
            span,
        )
    }

    fn missing_type_annotation(&self, binding: &str, span: SourceSpan) -> GraftError {
        self.report(
            ErrorKind::MissingTypeAnnotation {
                binding: binding.into(),
            },
            span,
        )
    }

    fn requires_optional_type(&self, binding: &str, annotation: &str, span: SourceSpan) -> GraftError {
        self.report(
            ErrorKind::RequiresOptionalType {
                binding: binding.into(),
                annotation: annotation.into(),
            },
            span,
        )
    }

    fn invalid_site(&self, request: &str, expected: &str, found: &str, span: SourceSpan) -> GraftError {
        self.report(
            ErrorKind::InvalidSite {
                request: request.into(),
                expected: expected.into(),
                found: found.into(),
            },
            span,
        )
    }
}

impl ErrorKind {
    /// Get the error category for dispatch and test assertions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedSyntax { .. } => ErrorCategory::Parse,

            Self::DuplicateName { .. }
            | Self::UnknownTransformation { .. }
            | Self::KindMismatch { .. } => ErrorCategory::Dispatch,

            Self::MissingArgument { .. }
            | Self::ArgumentNotStringLiteral { .. }
            | Self::NotAnInteger { .. }
            | Self::MissingTypeAnnotation { .. }
            | Self::RequiresOptionalType { .. }
            | Self::InvalidSite { .. } => ErrorCategory::Expand,
        }
    }

    /// Get error code suffix for diagnostic codes
    /// Uses const evaluation for zero-cost error code generation
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::MalformedSyntax { .. } => "malformed_syntax",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::UnknownTransformation { .. } => "unknown_transformation",
            Self::KindMismatch { .. } => "kind_mismatch",
            Self::MissingArgument { .. } => "missing_argument",
            Self::ArgumentNotStringLiteral { .. } => "argument_not_string_literal",
            Self::NotAnInteger { .. } => "not_an_integer",
            Self::MissingTypeAnnotation { .. } => "missing_type_annotation",
            Self::RequiresOptionalType { .. } => "requires_optional_type",
            Self::InvalidSite { .. } => "invalid_site",
        }
    }

    /// The structured diagnostic code, `graft::<stage>::<suffix>`.
    /// This is also the `errorKind` value the driver reports to the host.
    pub fn code(&self) -> String {
        format!("graft::{}::{}", self.category(), self.code_suffix())
    }

    /// Help text attached automatically where a fix is always the same.
    fn default_help(&self) -> Option<String> {
        match self {
            Self::ArgumentNotStringLiteral { .. } => Some(
                "pass a plain string literal; interpolation cannot be resolved at expansion time"
                    .into(),
            ),
            Self::NotAnInteger { .. } => {
                Some("the argument must fold to an integer constant at expansion time".into())
            }
            Self::RequiresOptionalType { binding, annotation } => Some(format!(
                "store reads return nil for absent keys; declare the binding as '{}: {}?'",
                binding, annotation
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Dispatch,
    Expand,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Parse => "parse",
            Self::Dispatch => "dispatch",
            Self::Expand => "expand",
        };
        write!(f, "{}", stage)
    }
}

impl std::error::Error for GraftError {}

impl fmt::Display for GraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Diagnostic for GraftError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

impl GraftError {
    /// The structured diagnostic code, e.g. `graft::expand::missing_argument`.
    pub fn code(&self) -> &str {
        &self.diagnostic_info.error_code
    }

    /// Replace the auto-populated help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic_info.help = Some(help.into());
        self
    }

    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::MalformedSyntax { .. } => "malformed syntax".into(),
            ErrorKind::DuplicateName { .. } => "already registered".into(),
            ErrorKind::UnknownTransformation { .. } => "unknown transformation".into(),
            ErrorKind::KindMismatch { .. } => "kind mismatch".into(),
            ErrorKind::MissingArgument { .. } => "argument required".into(),
            ErrorKind::ArgumentNotStringLiteral { .. } => "not a plain string literal".into(),
            ErrorKind::NotAnInteger { .. } => "not an integer constant".into(),
            ErrorKind::MissingTypeAnnotation { .. } => "no type annotation".into(),
            ErrorKind::RequiresOptionalType { .. } => "non-optional type".into(),
            ErrorKind::InvalidSite { .. } => "unsupported site".into(),
        }
    }
}

impl ErrorReporting for SourceContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> GraftError {
        GraftError {
            source_info: SourceInfo {
                source: self.to_named_source(),
                primary_span: span,
                stage: kind.category(),
            },
            diagnostic_info: DiagnosticInfo {
                help: kind.default_help(),
                error_code: kind.code(),
            },
            kind,
        }
    }
}

/// Creates a placeholder span for errors not tied to a specific position in
/// the fragment text, such as registry failures at startup.
/// This makes the intent of using an empty span explicit and searchable.
pub fn unspanned() -> miette::SourceSpan {
    miette::SourceSpan::from(0..0)
}

/// Converts a syntax-tree Span to a miette SourceSpan.
/// Bridges the node span representation and the error reporting span format.
pub fn to_source_span(span: crate::syntax::Span) -> miette::SourceSpan {
    miette::SourceSpan::from(span.start..span.end)
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a GraftError with full miette diagnostics
///
/// This provides rich error formatting with source spans, suggestions, and
/// context. Use this for human-facing display in harness output.
pub fn print_error(error: GraftError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_carry_stage_and_suffix() {
        let kind = ErrorKind::MissingArgument {
            request: "echo".into(),
        };
        assert_eq!(kind.code(), "graft::expand::missing_argument");

        let kind = ErrorKind::UnknownTransformation {
            name: "nope".into(),
        };
        assert_eq!(kind.code(), "graft::dispatch::unknown_transformation");

        let kind = ErrorKind::MalformedSyntax {
            construct: "container".into(),
            detail: "missing closing brace".into(),
        };
        assert_eq!(kind.code(), "graft::parse::malformed_syntax");
    }

    #[test]
    fn report_attaches_source_and_code() {
        let source = SourceContext::from_fragment("request:echo", "#echo()");
        let error = source.missing_argument("echo", unspanned());
        assert_eq!(error.code(), "graft::expand::missing_argument");
        assert!(error.to_string().contains("'echo'"));
    }

    #[test]
    fn optionality_help_names_the_fix() {
        let source = SourceContext::fallback("test");
        let error = source.requires_optional_type("count", "Int", unspanned());
        let help = error.diagnostic_info.help.as_deref();
        assert!(help.is_some_and(|h| h.contains("count: Int?")));
    }

    #[test]
    fn report_renders_label_and_help() {
        let source = SourceContext::from_fragment("request:backed", "var count: Int");
        let error =
            source.requires_optional_type("count", "Int", miette::SourceSpan::from(4..9));
        let report = miette::Report::new(error);
        let output = format!("{report:?}");
        assert!(output.contains("non-optional type"));
        assert!(output.contains("count: Int?"));
    }
}
