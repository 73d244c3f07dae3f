mod error;
mod operations;
mod registration;

pub use error::QueryError;
pub use operations::{FLIGHTS_MAX, UcsQueries};
pub use registration::format_registration;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use cache::{MemoryBackend, ResultCache};
    use domain::GliderCandidate;
    use session::{UcsSession, UcsSessionManager};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StubMatcher;
    impl domain::GliderMatcher for StubMatcher {
        fn closest(&self, name: &str) -> Vec<GliderCandidate> {
            vec![GliderCandidate { id: name.to_string(), score: 1.0 }]
        }
    }

    fn setup(server: &MockServer) -> UcsQueries<MemoryBackend> {
        let manager = Arc::new(UcsSessionManager::new());
        let session = Arc::new(
            UcsSession::new(format!("{}/", server.uri()), "pilot", "hunter2", None, manager).unwrap(),
        );
        let cache = Arc::new(ResultCache::new(MemoryBackend::new()));
        UcsQueries::new(session, cache, Arc::new(StubMatcher))
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/secure/login.html"))
            .respond_with(ResponseTemplate::new(200).insert_header("Set-Cookie", "OLCAUTH=tok; Path=/"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn resolve_flight_ref_extracts_ref_from_map_href() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/gliding/rest/flightstatistics.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"mapHref": "map.html?ref=-42"}
            ])))
            .mount(&server)
            .await;

        let queries = setup(&server);
        let flight_ref = queries.resolve_flight_ref(123).await.unwrap();
        assert_eq!(flight_ref, -42);
    }

    #[tokio::test]
    async fn resolve_flight_ref_asserts_single_entry() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/gliding/rest/flightstatistics.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"mapHref": "a?ref=1"},
                {"mapHref": "b?ref=2"}
            ])))
            .mount(&server)
            .await;

        let queries = setup(&server);
        let err = queries.resolve_flight_ref(123).await.unwrap_err();
        assert!(matches!(err, QueryError::Assertion(_)));
    }

    #[tokio::test]
    async fn resolve_flight_ref_second_call_is_a_cache_hit() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/gliding/rest/flightstatistics.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"mapHref": "map.html?ref=7"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let queries = setup(&server);
        let first = queries.resolve_flight_ref(999).await.unwrap();
        let second = queries.resolve_flight_ref(999).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn fetch_igc_decodes_text_and_derives_filename() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/gliding/download.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "application/igc")
                    .set_body_string("AXXXfoo\nline2"),
            )
            .mount(&server)
            .await;

        let queries = setup(&server);
        let (filename, data) = queries.fetch_igc(-55, false).await.unwrap();
        assert_eq!(filename, "55.igc");
        assert!(data.contains("line2"));
    }
}
