use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    Remote,
}

/// Process configuration, loaded from the environment the way the teacher
/// crate's config layer does: each field has a documented env var and a
/// sane default so local/dev runs need nothing set.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub proxy_url: Option<String>,
    pub ucs_default_user: String,
    pub ucs_default_password: String,
    pub cache_backend: CacheBackendKind,
    pub cache_host: Option<String>,
    pub cache_port: Option<u16>,
    pub local_mode: bool,
    pub adaptive_cap_floor: usize,
    pub adaptive_cap_ceiling: usize,
    pub dfs_upload_concurrency: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let local_mode = env_truthy("LOCAL");

        let cache_backend = match env::var("CACHE_BACKEND").ok().as_deref() {
            Some("remote") => CacheBackendKind::Remote,
            _ => CacheBackendKind::Memory,
        };

        Ok(Self {
            proxy_url: env::var("PROXY_URL").ok(),
            ucs_default_user: env::var("UCS_DEFAULT_USER")
                .unwrap_or_else(|_| "demo_pilot".to_string()),
            ucs_default_password: env::var("UCS_DEFAULT_PASSWORD").unwrap_or_default(),
            cache_backend,
            cache_host: env::var("CACHE_HOST").ok(),
            cache_port: env::var("CACHE_PORT").ok().and_then(|v| v.parse().ok()),
            local_mode,
            adaptive_cap_floor: env::var("ADAPTIVE_CAP_FLOOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            adaptive_cap_ceiling: env::var("ADAPTIVE_CAP_CEILING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(32),
            dfs_upload_concurrency: env::var("DFS_UPLOAD_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        })
    }
}

fn env_truthy(key: &str) -> bool {
    matches!(
        env::var(key).ok().as_deref(),
        Some("1") | Some("true") | Some("TRUE") | Some("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_hold_with_no_env_set() {
        // SAFETY: test-only, single-threaded env mutation scoped to this fn.
        unsafe {
            env::remove_var("LOCAL");
            env::remove_var("CACHE_BACKEND");
            env::remove_var("ADAPTIVE_CAP_FLOOR");
        }
        let config = AppConfig::from_env().unwrap();
        assert!(!config.local_mode);
        assert_eq!(config.cache_backend, CacheBackendKind::Memory);
        assert_eq!(config.adaptive_cap_floor, 4);
        assert_eq!(config.adaptive_cap_ceiling, 32);
        assert_eq!(config.dfs_upload_concurrency, 2);
    }

    #[test]
    fn local_mode_recognizes_truthy_values() {
        // SAFETY: test-only, single-threaded env mutation scoped to this fn.
        unsafe {
            env::set_var("LOCAL", "true");
        }
        let config = AppConfig::from_env().unwrap();
        assert!(config.local_mode);
        unsafe {
            env::remove_var("LOCAL");
        }
    }
}
