use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// A cache key was built from zero contributing arguments. Every
    /// cacheable call must carry at least one non-underscore-prefixed
    /// positional or keyword argument.
    #[error("cache key requires at least one argument after exclusions, operation {0}")]
    ProgrammerError(String),

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache value (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}
