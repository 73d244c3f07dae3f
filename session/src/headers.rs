/// A plausible browser header triple used for login requests, so UCS sees
/// varied-looking traffic across sessions instead of one obvious bot
/// fingerprint.
pub struct HeaderSet {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
    pub accept: &'static str,
}

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

static HEADER_POOL: &[HeaderSet] = &[
    HeaderSet {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        accept_language: ACCEPT_LANGUAGE,
        accept: ACCEPT,
    },
    HeaderSet {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
        accept_language: ACCEPT_LANGUAGE,
        accept: ACCEPT,
    },
    HeaderSet {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        accept_language: ACCEPT_LANGUAGE,
        accept: ACCEPT,
    },
    HeaderSet {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
        accept_language: ACCEPT_LANGUAGE,
        accept: ACCEPT,
    },
    HeaderSet {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7; rv:89.0) Gecko/20100101 Firefox/89.0",
        accept_language: ACCEPT_LANGUAGE,
        accept: ACCEPT,
    },
    HeaderSet {
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Mobile/15E148 Safari/604.1",
        accept_language: ACCEPT_LANGUAGE,
        accept: ACCEPT,
    },
    HeaderSet {
        user_agent: "Mozilla/5.0 (Linux; Android 11; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Mobile Safari/537.36",
        accept_language: ACCEPT_LANGUAGE,
        accept: ACCEPT,
    },
    HeaderSet {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/91.0.864.59",
        accept_language: ACCEPT_LANGUAGE,
        accept: ACCEPT,
    },
];

pub fn random_header_set() -> &'static HeaderSet {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..HEADER_POOL.len());
    &HEADER_POOL[idx]
}
