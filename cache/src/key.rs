use crate::error::CacheError;

/// The upstream user id for which caching is always bypassed (§4.5).
pub const CACHE_BYPASS_SENTINEL_USER: i64 = 81464;

/// A single positional or keyword argument contributing to a cache key.
///
/// Only the handful of shapes UCS operations actually pass (user/flight
/// ids, years, flags) are represented; this is a key-building helper, not a
/// general serialization format.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyArg {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl KeyArg {
    fn is_underscore_prefixed(&self) -> bool {
        matches!(self, KeyArg::Str(s) if s.starts_with('_'))
    }

    fn render(&self) -> String {
        match self {
            KeyArg::Str(s) => format!("{s:?}"),
            KeyArg::Int(i) => i.to_string(),
            KeyArg::Bool(b) => b.to_string(),
        }
    }
}

impl From<i64> for KeyArg {
    fn from(v: i64) -> Self {
        KeyArg::Int(v)
    }
}

impl From<u64> for KeyArg {
    fn from(v: u64) -> Self {
        KeyArg::Int(v as i64)
    }
}

impl From<&str> for KeyArg {
    fn from(v: &str) -> Self {
        KeyArg::Str(v.to_string())
    }
}

impl From<bool> for KeyArg {
    fn from(v: bool) -> Self {
        KeyArg::Bool(v)
    }
}

/// Result of building a cache key for one call.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    /// Normal cache-aside key.
    Key(String),
    /// The sentinel user bypassed caching; the string is unique per call
    /// and exists only so callers can still log/trace something stable.
    Bypass(String),
}

/// Builds a cache key for `op_name` from its positional and keyword
/// arguments, excluding any positional whose rendered value begins with `_`
/// and any keyword whose name begins with `_` (§4.5).
///
/// Returns `CacheError::ProgrammerError` if nothing remains after
/// exclusions.
pub fn build_key(
    op_name: &str,
    positional: &[KeyArg],
    keyword: &[(String, KeyArg)],
) -> Result<CacheKey, CacheError> {
    let args: Vec<&KeyArg> = positional
        .iter()
        .filter(|a| !a.is_underscore_prefixed())
        .collect();

    let mut kwargs: Vec<&(String, KeyArg)> = keyword
        .iter()
        .filter(|(k, _)| !k.starts_with('_'))
        .collect();
    kwargs.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(first) = args.first() {
        if matches!(first, KeyArg::Int(v) if *v == CACHE_BYPASS_SENTINEL_USER) {
            let unique = format!("{op_name}:no_cache_{}", rand::random::<u64>());
            return Ok(CacheKey::Bypass(unique));
        }
    }

    if args.is_empty() && kwargs.is_empty() {
        return Err(CacheError::ProgrammerError(op_name.to_string()));
    }

    let args_repr = args.iter().map(|a| a.render()).collect::<Vec<_>>().join(",");
    let kwargs_repr = kwargs
        .iter()
        .map(|(k, v)| format!("{k}={}", v.render()))
        .collect::<Vec<_>>()
        .join(",");

    Ok(CacheKey::Key(format!(
        "{op_name}:({args_repr}):{{{kwargs_repr}}}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_args_produce_identical_keys() {
        let a = build_key(
            "resolve_flight_ref",
            &[KeyArg::Int(999)],
            &[("head_only".to_string(), KeyArg::Bool(false))],
        )
        .unwrap();
        let b = build_key(
            "resolve_flight_ref",
            &[KeyArg::Int(999)],
            &[("head_only".to_string(), KeyArg::Bool(false))],
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn underscore_prefixed_args_are_excluded() {
        let a = build_key("fetch_igc", &[KeyArg::Int(5)], &[]).unwrap();
        let b = build_key(
            "fetch_igc",
            &[KeyArg::Int(5), KeyArg::Str("_retry".into())],
            &[("_scrape".to_string(), KeyArg::Bool(true))],
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sentinel_user_bypasses_with_distinct_keys() {
        let a = build_key("list_flights", &[KeyArg::Int(CACHE_BYPASS_SENTINEL_USER)], &[]).unwrap();
        let b = build_key("list_flights", &[KeyArg::Int(CACHE_BYPASS_SENTINEL_USER)], &[]).unwrap();
        match (a, b) {
            (CacheKey::Bypass(a), CacheKey::Bypass(b)) => assert_ne!(a, b),
            other => panic!("expected bypass keys, got {other:?}"),
        }
    }

    #[test]
    fn empty_args_is_programmer_error() {
        let err = build_key("noop", &[], &[]).unwrap_err();
        assert!(matches!(err, CacheError::ProgrammerError(_)));
    }

    #[test]
    fn underscore_only_args_is_programmer_error() {
        let err = build_key("noop", &[KeyArg::Str("_x".into())], &[]).unwrap_err();
        assert!(matches!(err, CacheError::ProgrammerError(_)));
    }
}
