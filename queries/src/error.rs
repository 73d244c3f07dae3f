use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Ucs(#[from] session::UcsError),

    #[error(transparent)]
    Cache(#[from] cache::CacheError),

    /// A response that should carry exactly one element didn't
    /// (`resolve_flight_ref`'s cardinality assertion).
    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("could not decode response body as UTF-8 or Latin-1 for flight_ref {0}")]
    Undecodable(domain::FlightRef),

    #[error("scrape failed: {0}")]
    Scrape(String),
}
