//! Structured errors.
//!
//! Every failure path in the engine produces a `StructiveError` carrying a
//! stable code, a message, an optional JSON context and a docs link. The
//! engine never uses panics or exceptions for control flow; recoverable
//! sites log through [`report`] and continue.

use serde::Serialize;
use std::fmt;

/// Stable error codes, grouped by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// Empty segment in a path pattern.
    PathEmptySegment,
    /// Reserved identifier used as a path segment.
    PathReservedWord,
    /// More wildcards than the engine supports.
    PathWildcardLimit,
    /// Property missing during a structural state walk.
    StatePropertyMissing,
    /// The proxy ref stack was empty (or overflowed) where a ref was required.
    RefStackViolation,
    /// Write attempted through a readonly state handle.
    ReadonlyWrite,
    /// Reserved: a non-callable handed to `invoke`. Statically unreachable
    /// here, kept for taxonomy parity.
    InvokeNotCallable,
    /// An invoked update callback failed.
    InvokeFailed,
    /// A loop context was entered while another was active.
    LoopContextBusy,
    /// A list index was missing or out of range.
    ListIndexMissing,
    /// Loop-context or wildcard resolution failed for a binding.
    BindingResolution,
    /// Out-of-range `$N` loop-index accessor.
    LoopIndexOutOfRange,
    /// A binding-contract method with no implementation was hit.
    BindingContract,
    /// Unknown filter name.
    UnknownFilter,
    /// Path node missing while walking static dependencies.
    PathNodeMissing,
    /// Path info missing while walking dynamic dependencies.
    PathInfoMissing,
    /// The updated callback failed after a render.
    UpdatedCallbackFailed,
    /// Cross-component read crossed an unmapped path.
    OutputNotMappedGet,
    /// Cross-component write crossed an unmapped path.
    OutputNotMappedSet,
    /// A tag resolved to a component class registered under another tag.
    AmbiguousTag,
    /// No component class registered for a tag at notify time.
    UndefinedComponent,
    /// Unknown template id.
    TemplateMissing,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PathEmptySegment => "PATH-101",
            ErrorCode::PathReservedWord => "PATH-102",
            ErrorCode::PathWildcardLimit => "PATH-103",
            ErrorCode::StatePropertyMissing => "STC-001",
            ErrorCode::RefStackViolation => "STC-002",
            ErrorCode::ReadonlyWrite => "STATE-202",
            ErrorCode::InvokeNotCallable => "STATE-203",
            ErrorCode::InvokeFailed => "STATE-204",
            ErrorCode::LoopContextBusy => "STATE-301",
            ErrorCode::ListIndexMissing => "LIST-201",
            ErrorCode::BindingResolution => "BIND-201",
            ErrorCode::LoopIndexOutOfRange => "BIND-202",
            ErrorCode::BindingContract => "BIND-301",
            ErrorCode::UnknownFilter => "FLT-201",
            ErrorCode::PathNodeMissing => "UPD-003",
            ErrorCode::PathInfoMissing => "UPD-004",
            ErrorCode::UpdatedCallbackFailed => "UPD-005",
            ErrorCode::OutputNotMappedGet => "CSO-101",
            ErrorCode::OutputNotMappedSet => "CSO-102",
            ErrorCode::AmbiguousTag => "COMP-401",
            ErrorCode::UndefinedComponent => "COMP-402",
            ErrorCode::TemplateMissing => "TMP-101",
        }
    }

    pub fn docs_url(&self) -> String {
        format!("https://structive.dev/docs/errors/{}", self.as_str())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// The one error type the engine raises.
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct StructiveError {
    pub code: ErrorCode,
    pub message: String,
    pub context: serde_json::Value,
    pub docs_url: String,
    pub severity: Severity,
    #[source]
    pub cause: Option<Box<StructiveError>>,
}

impl StructiveError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            docs_url: code.docs_url(),
            message: message.into(),
            context: serde_json::Value::Null,
            severity: Severity::Error,
            cause: None,
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message).with_severity(Severity::Warning)
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_cause(mut self, cause: StructiveError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type Result<T, E = StructiveError> = std::result::Result<T, E>;

/// Log an error without aborting the surrounding loop.
pub fn report(error: &StructiveError) {
    match error.severity {
        Severity::Error => tracing::error!(
            code = error.code.as_str(),
            docs = %error.docs_url,
            context = %error.context,
            "{}",
            error.message
        ),
        Severity::Warning => tracing::warn!(
            code = error.code.as_str(),
            docs = %error.docs_url,
            context = %error.context,
            "{}",
            error.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_with_family_prefix() {
        assert_eq!(ErrorCode::StatePropertyMissing.as_str(), "STC-001");
        assert_eq!(ErrorCode::UnknownFilter.as_str(), "FLT-201");
        let err = StructiveError::new(ErrorCode::ListIndexMissing, "list index not found");
        assert_eq!(format!("{err}"), "[LIST-201] list index not found");
        assert!(err.docs_url.ends_with("LIST-201"));
    }

    #[test]
    fn context_and_cause_round_trip() {
        let inner = StructiveError::new(ErrorCode::StatePropertyMissing, "no such path");
        let err = StructiveError::new(ErrorCode::InvokeFailed, "update failed")
            .with_context(serde_json::json!({ "path": "items.0.name" }))
            .with_cause(inner);
        assert_eq!(err.context["path"], "items.0.name");
        assert_eq!(err.cause.as_ref().map(|c| c.code), Some(ErrorCode::StatePropertyMissing));
    }
}
