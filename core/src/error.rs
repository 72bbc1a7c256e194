//! The error taxonomy shared by every tool surface (spec §6/§7).
//!
//! Nothing in this crate panics or throws on caller-supplied input; every
//! fallible operation either returns `Result<T, AnalysisError>` or pushes an
//! [`AnalysisError`] onto a response's `errors` list and continues with the
//! remaining files. `AnalysisErrorCode` is the closed sum type backing the
//! string codes in the Python original (`AnalysisError.code`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the error codes defined at the tool boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisErrorCode {
    NotFound,
    ParseError,
    FileTooLarge,
    ExcludedPath,
    PermissionDenied,
    InvalidInput,
    InvalidEntryPoint,
    CallTraceError,
    FunctionAnalysisError,
    BatchProcessingError,
    MemoryLimitExceeded,
    Timeout,
    TypeResolutionError,
    UnknownType,
    CircularReferenceDetected,
    ConstraintDepthExceeded,
}

impl AnalysisErrorCode {
    /// Category used by the `success` flag computation (spec §7).
    pub fn category(self) -> ErrorCategory {
        use AnalysisErrorCode::*;
        match self {
            NotFound | InvalidInput | InvalidEntryPoint | ExcludedPath | FileTooLarge
            | PermissionDenied => ErrorCategory::Input,
            ParseError => ErrorCategory::Parse,
            UnknownType | CircularReferenceDetected | ConstraintDepthExceeded
            | TypeResolutionError => ErrorCategory::TypeResolution,
            MemoryLimitExceeded | Timeout => ErrorCategory::Resource,
            FunctionAnalysisError | CallTraceError | BatchProcessingError => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        use AnalysisErrorCode::*;
        match self {
            NotFound => "NOT_FOUND",
            ParseError => "PARSE_ERROR",
            FileTooLarge => "FILE_TOO_LARGE",
            ExcludedPath => "EXCLUDED_PATH",
            PermissionDenied => "PERMISSION_DENIED",
            InvalidInput => "INVALID_INPUT",
            InvalidEntryPoint => "INVALID_ENTRY_POINT",
            CallTraceError => "CALL_TRACE_ERROR",
            FunctionAnalysisError => "FUNCTION_ANALYSIS_ERROR",
            BatchProcessingError => "BATCH_PROCESSING_ERROR",
            MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            Timeout => "TIMEOUT",
            TypeResolutionError => "TYPE_RESOLUTION_ERROR",
            UnknownType => "UNKNOWN_TYPE",
            CircularReferenceDetected => "CIRCULAR_REFERENCE_DETECTED",
            ConstraintDepthExceeded => "CONSTRAINT_DEPTH_EXCEEDED",
        }
    }
}

impl fmt::Display for AnalysisErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad bucket an [`AnalysisErrorCode`] falls into, used to compute the
/// overall `success` flag on a response (spec §7: "true unless zero useful
/// results were produced or only resource/internal errors occurred").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Parse,
    TypeResolution,
    Resource,
    Internal,
}

/// A single accumulated failure, attached to the file/line it occurred at.
/// Mirrors the original `AnalysisError` dataclass field-for-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisError {
    pub code: AnalysisErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl AnalysisError {
    pub fn new(code: AnalysisErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            file: None,
            line: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn not_found(file: impl Into<String>) -> Self {
        let file = file.into();
        Self::new(
            AnalysisErrorCode::NotFound,
            format!("File not found: {file}"),
        )
        .with_file(file)
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(file) = &self.file {
            write!(f, " ({file}")?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for AnalysisError {}

/// Compute the top-level `success` flag for a response given its errors and
/// whether at least one useful result was produced (spec §7, last line).
pub fn overall_success(errors: &[AnalysisError], produced_any_result: bool) -> bool {
    if !produced_any_result {
        return false;
    }
    let only_resource_or_internal = !errors.is_empty()
        && errors.iter().all(|e| {
            matches!(
                e.code.category(),
                ErrorCategory::Resource | ErrorCategory::Internal
            )
        });
    if only_resource_or_internal {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_requires_some_result() {
        assert!(!overall_success(&[], false));
        assert!(overall_success(&[], true));
    }

    #[test]
    fn resource_only_errors_mark_response_unsuccessful() {
        let errors = vec![AnalysisError::new(AnalysisErrorCode::Timeout, "slow")];
        assert!(!overall_success(&errors, true));
    }

    #[test]
    fn mixed_errors_with_results_still_succeed() {
        let errors = vec![
            AnalysisError::new(AnalysisErrorCode::Timeout, "slow"),
            AnalysisError::not_found("a.ts"),
        ];
        assert!(overall_success(&errors, true));
    }

    #[test]
    fn error_display_includes_location() {
        let err = AnalysisError::not_found("a.ts").with_line(3);
        assert_eq!(err.to_string(), "[NOT_FOUND] File not found: a.ts (a.ts:3)");
    }
}
