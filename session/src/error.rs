use thiserror::Error;

/// Semantic error taxonomy for the UCS request pipeline (spec §7). These
/// are kinds, not raw transport types — callers map them to user-visible
/// responses (retryable vs. not) without inspecting `reqwest` internals.
#[derive(Error, Debug)]
pub enum UcsError {
    /// HTTP 429, connect/read timeout, connection reset, 5xx after retries.
    #[error("transient upstream error: {0}")]
    TransientUpstream(String),

    /// HTTP 404, "HTML returned" sentinel, malformed JSON.
    #[error("permanent upstream error: {0}")]
    PermanentUpstream(String),

    /// Missing auth cookie after login, "Faulty entry" marker, second
    /// consecutive 302 on download.
    #[error("auth failure: {0}")]
    AuthFailure(String),

    /// Upstream username fails the is-not-all-digits precondition.
    #[error("invalid credential: {0}")]
    CredentialInvalid(String),
}

impl UcsError {
    pub fn is_transient(&self) -> bool {
        matches!(self, UcsError::TransientUpstream(_))
    }
}
