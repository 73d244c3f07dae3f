use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

/// Cookies scoped to a single base URL, keyed by cookie name.
pub type CookieJar = HashMap<String, String>;

const AUTH_COOKIE: &str = "OLCAUTH";

/// Process-wide cookie storage and per-user login serialization, mirroring
/// the upstream `OlcInterface.user_cookies` / `user_locks` class state: one
/// lock per UCS username so two concurrent requests for the same user never
/// race to log in twice, while different users can log in concurrently.
#[derive(Default)]
pub struct UcsSessionManager {
    cookies: SyncMutex<HashMap<String, CookieJar>>,
    locks: SyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl UcsSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the login lock for `user`, creating one on first use.
    pub fn login_lock(&self, user: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    pub fn cookies_for(&self, user: &str) -> Option<CookieJar> {
        self.cookies.lock().get(user).cloned()
    }

    pub fn store_cookies(&self, user: &str, jar: CookieJar) {
        self.cookies.lock().insert(user.to_string(), jar);
    }

    pub fn has_auth_cookie(&self, user: &str) -> bool {
        self.cookies
            .lock()
            .get(user)
            .is_some_and(|jar| jar.contains_key(AUTH_COOKIE))
    }
}

/// Parses `Set-Cookie` response header values into `(name, value)` pairs,
/// ignoring attributes (`Path`, `Expires`, ...). `reqwest`'s cookie store is
/// opaque to reads, so the auth-cookie presence check needs its own parse.
pub fn parse_set_cookie_owned<I, S>(values: I) -> CookieJar
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut jar = CookieJar::new();
    for value in values {
        let value = value.as_ref();
        let pair = value.split(';').next().unwrap_or(value);
        if let Some((name, val)) = pair.split_once('=') {
            jar.insert(name.trim().to_string(), val.trim().to_string());
        }
    }
    jar
}

/// Merges freshly-seen `Set-Cookie` pairs into `jar`, overwriting same-named
/// entries, matching `CookieJar.update_cookies` semantics.
pub fn merge_cookies(jar: &mut CookieJar, fresh: CookieJar) {
    jar.extend(fresh);
}

/// Serializes a jar back into a `Cookie:` request header value.
pub fn cookie_header(jar: &CookieJar) -> String {
    jar.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn auth_cookie_name() -> &'static str {
    AUTH_COOKIE
}
