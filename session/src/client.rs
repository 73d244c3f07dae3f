use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::UcsError;
use crate::headers::random_header_set;
use crate::manager::{UcsSessionManager, auth_cookie_name, cookie_header, parse_set_cookie_owned};

/// OLC will fail fast when stalling the response; the proxy path is given
/// more headroom since ScraperAPI itself adds latency.
const DIRECT_TIMEOUT: Duration = Duration::from_secs(30);
const DIRECT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROXY_TIMEOUT: Duration = Duration::from_secs(60);

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Owns the HTTP machinery for one UCS credential: cookie reuse/login,
/// direct vs. proxy client selection, and the retry-with-proxy-fallback
/// request pipeline (spec §4.4).
pub struct UcsSession {
    base: String,
    user: String,
    password: String,
    proxy_url: Option<String>,
    manager: Arc<UcsSessionManager>,
    direct: Client,
    direct_no_redirect: Client,
    proxy: Option<Client>,
    proxy_no_redirect: Option<Client>,
}

impl UcsSession {
    pub fn new(
        base: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        proxy_url: Option<String>,
        manager: Arc<UcsSessionManager>,
    ) -> Result<Self, UcsError> {
        let user = user.into();
        if !user.chars().any(|c| c.is_alphabetic()) {
            return Err(UcsError::CredentialInvalid(format!(
                "username cannot be all numbers, fill your OLC username, not your ID: {user}"
            )));
        }

        let headers = random_header_set();
        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(
            reqwest::header::USER_AGENT,
            headers.user_agent.parse().expect("static header is valid"),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            headers.accept_language.parse().expect("static header is valid"),
        );
        default_headers.insert(
            reqwest::header::ACCEPT,
            headers.accept.parse().expect("static header is valid"),
        );

        let build = |timeout: Duration, connect_timeout: Duration, redirect: reqwest::redirect::Policy, proxy: Option<&str>| -> Result<Client, UcsError> {
            let mut builder = Client::builder()
                .default_headers(default_headers.clone())
                .timeout(timeout)
                .connect_timeout(connect_timeout)
                .redirect(redirect);
            if let Some(proxy) = proxy {
                builder = builder.proxy(
                    reqwest::Proxy::all(proxy)
                        .map_err(|e| UcsError::PermanentUpstream(format!("invalid proxy url: {e}")))?,
                );
            }
            builder
                .build()
                .map_err(|e| UcsError::PermanentUpstream(format!("failed to build http client: {e}")))
        };

        let direct = build(DIRECT_TIMEOUT, DIRECT_CONNECT_TIMEOUT, reqwest::redirect::Policy::default(), None)?;
        let direct_no_redirect = build(DIRECT_TIMEOUT, DIRECT_CONNECT_TIMEOUT, reqwest::redirect::Policy::none(), None)?;
        let (proxy, proxy_no_redirect) = match proxy_url.as_deref() {
            Some(url) => (
                Some(build(PROXY_TIMEOUT, DIRECT_CONNECT_TIMEOUT, reqwest::redirect::Policy::default(), Some(url))?),
                Some(build(PROXY_TIMEOUT, DIRECT_CONNECT_TIMEOUT, reqwest::redirect::Policy::none(), Some(url))?),
            ),
            None => (None, None),
        };

        Ok(Self {
            base: base.into(),
            user,
            password: password.into(),
            proxy_url,
            manager,
            direct,
            direct_no_redirect,
            proxy,
            proxy_no_redirect,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    fn client_for(&self, use_proxy: bool, allow_redirect: bool) -> &Client {
        match (use_proxy, allow_redirect) {
            (true, true) => self.proxy.as_ref().unwrap_or(&self.direct),
            (true, false) => self.proxy_no_redirect.as_ref().unwrap_or(&self.direct_no_redirect),
            (false, true) => &self.direct,
            (false, false) => &self.direct_no_redirect,
        }
    }

    /// Logs in unless cookies are already present with the auth cookie set,
    /// matching `OlcInterface.login`'s reuse-then-lock-then-recheck shape.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn login(&self, force: bool) -> Result<(), UcsError> {
        if !force && self.manager.has_auth_cookie(&self.user) {
            return Ok(());
        }

        let lock = self.manager.login_lock(&self.user);
        let _guard = lock.lock().await;

        if !force && self.manager.has_auth_cookie(&self.user) {
            return Ok(());
        }

        debug!("logging into UCS");
        let start = std::time::Instant::now();

        let response = self
            .direct
            .post(format!("{}secure/login.html", self.base))
            .form(&[
                ("_ident_", self.user.as_str()),
                ("_name__", self.password.as_str()),
                ("ok_par.x", "1"),
            ])
            .send()
            .await
            .map_err(|e| UcsError::TransientUpstream(format!("login request failed: {e}")))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!("429 returned on login");
        }

        let set_cookie: Vec<String> = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        let had_set_cookie = !set_cookie.is_empty();
        let jar = parse_set_cookie_owned(set_cookie);

        let body = response
            .text()
            .await
            .map_err(|e| UcsError::TransientUpstream(format!("failed to read login response: {e}")))?;

        if body.contains("Faulty entry") {
            return Err(UcsError::AuthFailure(format!(
                "login credentials not correct for user {}: faulty entry. Ensure you used the correct UCS username and not the UCS ID",
                self.user
            )));
        }

        if !jar.contains_key(auth_cookie_name()) {
            let mobile_login_present = body.contains("OLCmobileLogin");
            return Err(UcsError::AuthFailure(format!(
                "login cookies not found for user {} (set_cookie={had_set_cookie}, mobile_login_marker={mobile_login_present})",
                self.user
            )));
        }

        self.manager.store_cookies(&self.user, jar);
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "login succeeded");
        Ok(())
    }

    fn cookie_header(&self) -> Option<String> {
        self.manager
            .cookies_for(&self.user)
            .map(|jar| cookie_header(&jar))
            .filter(|h| !h.is_empty())
    }

    /// High-level JSON request: 401-triggers-relogin-and-retry-once, 404 is
    /// permanent, HTML content-type is treated as a failure sentinel,
    /// timeouts force a single proxy-retried attempt, and the inner
    /// transport retries up to [`RETRY_ATTEMPTS`] times with exponential
    /// backoff on 429/connection errors (spec §4.4).
    #[instrument(skip(self, query), fields(user = %self.user, %path))]
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
    ) -> Result<T, UcsError> {
        self.login(false).await?;
        self.request_json_inner(method, path, query, body, true).await
    }

    async fn request_json_inner<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
        allow_relogin: bool,
    ) -> Result<T, UcsError> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .attempt_with_retry(|use_proxy| {
                let mut req = self.client_for(use_proxy, true).request(method.clone(), &url);
                if let Some(cookie) = self.cookie_header() {
                    req = req.header(reqwest::header::COOKIE, cookie);
                }
                if let Some(q) = query {
                    req = req.query(q);
                }
                if let Some(b) = body {
                    req = req.json(b);
                }
                req
            })
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if allow_relogin {
                warn!("got 401, re-logging in");
                self.login(true).await?;
                return Box::pin(self.request_json_inner(method, path, query, body, false)).await;
            }
            return Err(UcsError::AuthFailure("401 after re-login".into()));
        }

        if response.status() == StatusCode::NOT_FOUND {
            return Err(UcsError::PermanentUpstream(format!("404 Not Found for {path}")));
        }

        if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            if content_type.to_str().unwrap_or("").starts_with("text/html") {
                return Err(UcsError::PermanentUpstream("HTML returned in UCS response".into()));
            }
        }

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UcsError::TransientUpstream(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(UcsError::PermanentUpstream(format!("UCS response: {status} {text}")));
        }

        serde_json::from_str::<T>(&text)
            .map_err(|e| UcsError::PermanentUpstream(format!("UCS response: invalid JSON: {e}")))
    }

    /// Low-level request: transport retry/backoff/timeout-forces-proxy only,
    /// no status interpretation. `fetch_igc` builds its own 302/429/content
    /// handling on top of this.
    #[instrument(skip(self), fields(user = %self.user, %path))]
    pub async fn request_raw(
        &self,
        method: reqwest::Method,
        path: &str,
        allow_redirect: bool,
    ) -> Result<reqwest::Response, UcsError> {
        let url = format!("{}{}", self.base, path);
        self.attempt_with_retry(|use_proxy| {
            let mut req = self.client_for(use_proxy, allow_redirect).request(method.clone(), &url);
            if let Some(cookie) = self.cookie_header() {
                req = req.header(reqwest::header::COOKIE, cookie);
            }
            req
        })
        .await
    }

    /// 3-attempt exponential backoff, retrying only 429 and connection/read
    /// errors. Attempt 1 is direct; attempts 2+ use the proxy if configured.
    /// A timeout on the final attempt triggers one forced-proxy retry of the
    /// whole sequence, mirroring the Python `_do_request`/`fetch_igc`
    /// `except asyncio.TimeoutError` branch.
    async fn attempt_with_retry<F>(&self, build: F) -> Result<reqwest::Response, UcsError>
    where
        F: Fn(bool) -> reqwest::RequestBuilder,
    {
        match self.attempt_sequence(&build, false).await {
            Ok(response) => Ok(response),
            Err(TransportOutcome::Timeout) if self.proxy_url.is_some() => {
                warn!("request timed out, forcing proxy for a fresh attempt sequence");
                match self.attempt_sequence(&build, true).await {
                    Ok(response) => Ok(response),
                    Err(_) => Err(UcsError::TransientUpstream(
                        "took too long to fetch from UCS, try less at once".into(),
                    )),
                }
            }
            Err(_) => Err(UcsError::TransientUpstream("UCS request failed after retries".into())),
        }
    }

    async fn attempt_sequence<F>(
        &self,
        build: &F,
        force_proxy: bool,
    ) -> Result<reqwest::Response, TransportOutcome>
    where
        F: Fn(bool) -> reqwest::RequestBuilder,
    {
        let mut delay = RETRY_BASE_DELAY;
        let mut last = TransportOutcome::Other;

        for attempt in 1..=RETRY_ATTEMPTS {
            let use_proxy = force_proxy || attempt > 1;
            let response = build(use_proxy).send().await;

            match response {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    last = TransportOutcome::RateLimited;
                    debug!(attempt, "429 received, retrying");
                }
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() => {
                    last = TransportOutcome::Timeout;
                    debug!(attempt, "timeout");
                    break;
                }
                Err(e) if e.is_connect() => {
                    last = TransportOutcome::ConnectionError;
                    debug!(attempt, error = %e, "connection error, retrying");
                }
                Err(e) => {
                    last = TransportOutcome::Other;
                    debug!(attempt, error = %e, "non-retryable transport error");
                    break;
                }
            }

            if attempt < RETRY_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(last)
    }
}

enum TransportOutcome {
    RateLimited,
    ConnectionError,
    Timeout,
    Other,
}
