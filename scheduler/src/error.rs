use std::fmt;
use std::sync::Arc;

/// The boxed error a `WorkItem` propagates to its completion handle.
/// Carries an `Arc` so scheduler-internal bookkeeping can inspect the error
/// (e.g. for logging) without taking ownership away from the caller.
#[derive(Clone)]
pub struct TaskError(Arc<dyn std::error::Error + Send + Sync>);

impl TaskError {
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for TaskError {}

impl From<session::UcsError> for TaskError {
    fn from(err: session::UcsError) -> Self {
        TaskError::new(err)
    }
}
