// Failure diagnostics for the external short-link tool
//
// Maps stderr / error text to a coarse reason for logging. Every reason ends
// in the same `Failed` state; this only explains why.

use serde::{Deserialize, Serialize};

use crate::resolver::errors::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Binary is not installed or not executable
    ToolMissing,
    /// Network blocked, DNS failure or timeout
    NetworkBlocked,
    /// Pin was deleted or is private
    ContentUnavailable,
    /// Tool does not recognise the URL
    UnsupportedUrl,
    /// Tool ran but printed nothing
    EmptyOutput,
    Unknown,
}

impl FailureReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::ToolMissing => "short-link tool is not installed",
            Self::NetworkBlocked => "network blocked or timed out",
            Self::ContentUnavailable => "content removed or private",
            Self::UnsupportedUrl => "URL not supported by the tool",
            Self::EmptyOutput => "tool produced no output",
            Self::Unknown => "unknown failure",
        }
    }
}

/// Classify raw failure text from the tool
pub fn diagnose_failure(text: &str) -> FailureReason {
    let lower = text.to_lowercase();

    if lower.contains("failed to start")
        || lower.contains("no such file")
        || lower.contains("command not found")
    {
        return FailureReason::ToolMissing;
    }

    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("name resolution")
        || lower.contains("network is unreachable")
    {
        return FailureReason::NetworkBlocked;
    }

    if lower.contains("404")
        || lower.contains("not found")
        || lower.contains("410")
        || lower.contains("private")
        || lower.contains("403")
    {
        return FailureReason::ContentUnavailable;
    }

    if lower.contains("unsupported url") || lower.contains("no suitable extractor") {
        return FailureReason::UnsupportedUrl;
    }

    if lower.trim().is_empty() {
        return FailureReason::EmptyOutput;
    }

    FailureReason::Unknown
}

/// Classify a runner error
pub fn diagnose_error(err: &ResolveError) -> FailureReason {
    match err {
        ResolveError::Timeout(_) => FailureReason::NetworkBlocked,
        other => diagnose_failure(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_missing() {
        assert_eq!(
            diagnose_failure("Failed to start gallery-dl: No such file or directory (os error 2)"),
            FailureReason::ToolMissing
        );
    }

    #[test]
    fn test_network_blocked() {
        assert_eq!(
            diagnose_failure("[pinterest][error] HttpError: Connection refused"),
            FailureReason::NetworkBlocked
        );
        assert_eq!(
            diagnose_error(&ResolveError::Timeout(60)),
            FailureReason::NetworkBlocked
        );
    }

    #[test]
    fn test_content_unavailable() {
        assert_eq!(
            diagnose_failure("[pinterest][error] HttpError: '404 Not Found' for 'https://...'"),
            FailureReason::ContentUnavailable
        );
    }

    #[test]
    fn test_unsupported_and_empty() {
        assert_eq!(
            diagnose_failure("[error] Unsupported URL 'https://example.com'"),
            FailureReason::UnsupportedUrl
        );
        assert_eq!(diagnose_failure("  \n"), FailureReason::EmptyOutput);
        assert_eq!(diagnose_failure("weird"), FailureReason::Unknown);
    }
}
