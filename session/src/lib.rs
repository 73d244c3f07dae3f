mod client;
mod error;
mod headers;
mod manager;

pub use client::UcsSession;
pub use error::UcsError;
pub use manager::{CookieJar, UcsSessionManager};
