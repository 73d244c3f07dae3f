use thiserror::Error;

/// HTTP-handler-facing normalization of every internal error kind. Handlers
/// themselves are out of scope; this is the documented mapping contract
/// they'd use to turn a `QueryError`/`UcsError`/`TaskError` into a status
/// code and message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Upstream(_) => 502,
            AppError::Unauthorized(_) => 401,
            AppError::Internal(_) => 500,
        }
    }
}

impl From<session::UcsError> for AppError {
    fn from(err: session::UcsError) -> Self {
        match err {
            session::UcsError::TransientUpstream(m) => AppError::Upstream(m),
            session::UcsError::PermanentUpstream(m) => AppError::NotFound(m),
            session::UcsError::AuthFailure(m) => AppError::Unauthorized(m),
            session::UcsError::CredentialInvalid(m) => AppError::Unauthorized(m),
        }
    }
}

impl From<queries::QueryError> for AppError {
    fn from(err: queries::QueryError) -> Self {
        match err {
            queries::QueryError::Ucs(e) => e.into(),
            queries::QueryError::Cache(e) => AppError::Internal(e.to_string()),
            queries::QueryError::Assertion(m) => AppError::Internal(m),
            queries::QueryError::Undecodable(flight_ref) => {
                AppError::Internal(format!("undecodable IGC for flight_ref {flight_ref}"))
            }
            queries::QueryError::Scrape(m) => AppError::Upstream(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_upstream_maps_to_502() {
        let app_err: AppError = session::UcsError::TransientUpstream("slow".into()).into();
        assert_eq!(app_err.status_code(), 502);
    }

    #[test]
    fn auth_failure_maps_to_401() {
        let app_err: AppError = session::UcsError::AuthFailure("no cookie".into()).into();
        assert_eq!(app_err.status_code(), 401);
    }
}
