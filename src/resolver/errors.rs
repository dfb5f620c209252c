// Error types for link resolution
//
// Every variant is recoverable at the normalizer boundary: the orchestrator
// turns them into `DeliveryOutcome::Error` with `user_message()`.

use thiserror::Error;

use super::models::Provider;

pub type Result<T> = std::result::Result<T, ResolveError>;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Provider payload has nothing matching the kind/tag filter
    #[error("no deliverable candidates for {0}")]
    NoCandidates(Provider),

    /// External resolver or API failed outright
    #[error("{provider} resolver failed: {detail}")]
    ResolverFailure { provider: Provider, detail: String },

    /// Payload did not have the expected shape
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// API answered with an explicit error or an empty media list
    #[error("API rejected request: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// External process could not be run or exited with failure
    #[error("execution error: {0}")]
    Execution(String),

    /// External process exceeded its time budget
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// Internal fault (including a caught panic)
    #[error("unexpected fault: {0}")]
    Unexpected(String),
}

impl ResolveError {
    /// Caller-safe text for the `error` outcome. Never includes URLs, stderr
    /// or response bodies.
    pub fn user_message(&self, provider: Provider) -> String {
        match (self, provider) {
            (Self::NoCandidates(_), Provider::TikTok) => {
                "No video download links available.".to_string()
            }
            (Self::NoCandidates(_), Provider::Instagram) => {
                "No media found in this Instagram content.".to_string()
            }
            (Self::NoCandidates(_), Provider::Pinterest) => {
                "Content type not supported.".to_string()
            }
            (Self::Api(_), Provider::TikTok) | (Self::Http(_), Provider::TikTok) => {
                "Sorry, this video cannot be accessed.".to_string()
            }
            (Self::Api(_), Provider::Instagram) => {
                "Unable to process this Instagram content.".to_string()
            }
            (Self::ResolverFailure { .. }, Provider::Pinterest)
            | (Self::Execution(_), Provider::Pinterest)
            | (Self::Timeout(_), Provider::Pinterest) => {
                "Unable to process this Pinterest content. Make sure it's publicly accessible."
                    .to_string()
            }
            (_, Provider::TikTok) => "Sorry, this video cannot be accessed.".to_string(),
            (_, provider) => format!("Failed to process {} content.", provider),
        }
    }

    /// True when the failure came from an outside collaborator rather than
    /// from our own handling of its data.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::ResolverFailure { .. }
                | Self::Api(_)
                | Self::Http(_)
                | Self::Execution(_)
                | Self::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_details() {
        let err = ResolveError::ResolverFailure {
            provider: Provider::Pinterest,
            detail: "gallery-dl: HttpError 403 https://i.pinimg.com/secret".to_string(),
        };
        let msg = err.user_message(Provider::Pinterest);
        assert!(!msg.contains("403"));
        assert!(!msg.contains("pinimg"));
        assert!(msg.contains("publicly accessible"));
    }

    #[test]
    fn test_no_candidates_messages_per_provider() {
        let tiktok = ResolveError::NoCandidates(Provider::TikTok);
        assert_eq!(
            tiktok.user_message(Provider::TikTok),
            "No video download links available."
        );

        let insta = ResolveError::NoCandidates(Provider::Instagram);
        assert_eq!(
            insta.user_message(Provider::Instagram),
            "No media found in this Instagram content."
        );
    }

    #[test]
    fn test_unexpected_falls_back_to_generic() {
        let err = ResolveError::Unexpected("index out of bounds".to_string());
        assert_eq!(
            err.user_message(Provider::Instagram),
            "Failed to process Instagram content."
        );
        assert!(!err.is_external());
    }
}
