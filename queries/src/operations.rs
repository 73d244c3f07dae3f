use std::sync::Arc;

use cache::{CacheBackend, KeyArg, ResultCache, UCS_READ_TTL};
use chrono::{DateTime, Datelike};
use domain::{Flight, GliderMatcher};
use futures::future::join_all;
use reqwest::Method;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::json;
use session::UcsSession;
use tracing::{debug, instrument, warn};

use crate::error::QueryError;
use crate::registration::format_registration;

/// Max number of flights fetched from UCS per user (`flights_max` upstream).
pub const FLIGHTS_MAX: usize = 200;

/// OLC Plus exists from October 2010; years at or before 2010 use the
/// legacy competition type.
const OLC_PLUS_CUTOFF_YEAR: i32 = 2010;

#[derive(Debug, Deserialize)]
struct FlightBookResponse {
    result: Vec<Flight>,
}

#[derive(Debug, Deserialize)]
struct FlightStatisticsEntry {
    #[serde(rename = "mapHref")]
    map_href: String,
}

/// High-level UCS operations, each cacheable and submitted through the
/// scheduler by callers. Holds no scheduler reference itself: orchestration
/// (enqueue_one, per-user weighting) is the caller's responsibility, per
/// the out-of-scope HTTP-handler boundary.
pub struct UcsQueries<B: CacheBackend> {
    session: Arc<UcsSession>,
    cache: Arc<ResultCache<B>>,
    glider_matcher: Arc<dyn GliderMatcher>,
}

impl<B: CacheBackend> UcsQueries<B> {
    pub fn new(session: Arc<UcsSession>, cache: Arc<ResultCache<B>>, glider_matcher: Arc<dyn GliderMatcher>) -> Self {
        Self { session, cache, glider_matcher }
    }

    #[instrument(skip(self), fields(user_id, start_year, end_year))]
    pub async fn list_flights(
        &self,
        user_id: u64,
        start_year: i32,
        end_year: Option<i32>,
        scrape: bool,
    ) -> Result<Vec<Flight>, QueryError> {
        let args = [KeyArg::Int(user_id as i64), KeyArg::Int(start_year as i64)];
        let kwargs = [("end_year".to_string(), KeyArg::from(end_year.unwrap_or(0) as i64))];

        let session = self.session.clone();
        let glider_matcher = self.glider_matcher.clone();
        self.cache
            .get_or_insert_with("list_flights", UCS_READ_TTL, &args, &kwargs, || async move {
                fetch_and_enrich_flights(&session, &glider_matcher, user_id, start_year, end_year, scrape).await
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn resolve_flight_ref(&self, flight_id: u64) -> Result<i64, QueryError> {
        let args = [KeyArg::Int(flight_id as i64)];
        let session = self.session.clone();
        self.cache
            .get_or_insert_with("resolve_flight_ref", UCS_READ_TTL, &args, &[], || async move {
                let path = format!("gliding/rest/flightstatistics.json?dsIds={flight_id}");
                let entries: Vec<FlightStatisticsEntry> =
                    session.request_json(Method::GET, &path, None, None).await?;

                if entries.len() != 1 {
                    return Err(QueryError::Assertion(format!(
                        "expected exactly one flight_ref entry for flight {flight_id}, got {}",
                        entries.len()
                    )));
                }

                let map_href = &entries[0].map_href;
                let ref_str = map_href
                    .split_once("ref=")
                    .map(|(_, rest)| rest)
                    .ok_or_else(|| QueryError::Assertion(format!("no ref= in mapHref: {map_href}")))?;
                let flight_ref: i64 = ref_str
                    .parse()
                    .map_err(|_| QueryError::Assertion(format!("non-integer ref in mapHref: {ref_str}")))?;
                Ok(flight_ref)
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn fetch_igc(&self, flight_ref: i64, head_only: bool) -> Result<(String, String), QueryError> {
        let args = [KeyArg::Int(flight_ref)];
        let session = self.session.clone();
        self.cache
            .get_or_insert_with("fetch_igc", UCS_READ_TTL, &args, &[], || async move {
                fetch_igc_inner(&session, flight_ref, head_only, true).await
            })
            .await
    }

    /// HTML GET of the flight-info page; XPath-equivalent CSS extraction of
    /// aircraft, registration, competition id, and pilot comment. Mutates
    /// `flight` in place; never cached (no return value).
    #[instrument(skip(self, flight))]
    pub async fn scrape_flight(&self, flight: &mut Flight) -> Result<(), QueryError> {
        self.session.login(false).await?;
        let path = format!("gliding/flightinfo.html?dsId={}", flight.id);
        let response = self.session.request_raw(Method::GET, &path, true).await?;
        let html = response
            .text()
            .await
            .map_err(|e| QueryError::Scrape(format!("failed to read flightinfo body: {e}")))?;

        let document = Html::parse_document(&html);
        let dd_selector = Selector::parse(".OlcButtonBar dl dd").expect("static selector");
        let comment_selector = Selector::parse(".olcfiComment blockquote p").expect("static selector");

        let dds: Vec<String> = document
            .select(&dd_selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect();

        flight.aircraft = dds.first().cloned();
        flight.registration = format_registration(dds.get(1).map(String::as_str));
        flight.competition_id = dds.get(2).cloned();

        let comment_lines: Vec<String> = document
            .select(&comment_selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect();
        let comment = comment_lines.join("\n\n");
        flight.pilot_comment = if comment.starts_with('-') && comment.ends_with('-') {
            None
        } else if comment.is_empty() {
            None
        } else {
            Some(comment)
        };

        Ok(())
    }
}

async fn fetch_and_enrich_flights(
    session: &UcsSession,
    glider_matcher: &Arc<dyn GliderMatcher>,
    user_id: u64,
    start_year: i32,
    end_year: Option<i32>,
    scrape: bool,
) -> Result<Vec<Flight>, QueryError> {
    let current_year = end_year.unwrap_or_else(|| chrono::Utc::now().year());

    let years: Vec<i32> = (start_year..=current_year).rev().collect();
    let tasks = years.into_iter().map(|year| {
        let competition_type = if year <= OLC_PLUS_CUTOFF_YEAR { "olc" } else { "olcp" };
        fetch_one_year(session, user_id, year, competition_type)
    });

    let mut flights = Vec::new();
    for result in join_all(tasks).await {
        if flights.len() > FLIGHTS_MAX {
            debug!(user_id, "stopping flight fetch after flights_max");
            break;
        }
        match result {
            Ok(mut year_flights) => flights.append(&mut year_flights),
            Err(e) => {
                warn!(user_id, error = %e, "skipping a year of flights after fetch error");
            }
        }
    }

    for flight in &mut flights {
        enrich_flight(flight, glider_matcher);
    }

    if scrape {
        let scrape_tasks = flights.iter_mut().map(|flight| scrape_flight_best_effort(session, flight));
        join_all(scrape_tasks).await;
    }

    flights.sort_by_key(|f| f.id);
    Ok(flights)
}

async fn fetch_one_year(
    session: &UcsSession,
    user_id: u64,
    year: i32,
    competition_type: &str,
) -> Result<Vec<Flight>, QueryError> {
    let path = format!("gliding/flightbook.html?sp={year}&pi={user_id}");
    let body = json!({
        "q": "ds",
        "st": competition_type,
        "offset": 0,
        "limit": i32::MAX,
    });
    let response: FlightBookResponse = session.request_json(Method::POST, &path, None, Some(&body)).await?;
    Ok(response.result)
}

fn enrich_flight(flight: &mut Flight, glider_matcher: &Arc<dyn GliderMatcher>) {
    if let Some(candidate) = glider_matcher.closest(&flight.airplane).into_iter().next() {
        flight.airplane_matched = Some(candidate.id);
    }

    if let Some(date) = DateTime::from_timestamp_millis(flight.date_of_flight_ms) {
        flight.date = Some(date.date_naive().to_string());
    }

    flight.distance_in_km = round_to(flight.distance_in_km, 1);
    flight.speed_in_km_h = round_to(flight.speed_in_km_h, 1);

    if let Some(copilot) = &flight.copilot {
        flight.co_pilot_name = Some(copilot.full_name());
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

async fn scrape_flight_best_effort(session: &UcsSession, flight: &mut Flight) {
    let path = format!("gliding/flightinfo.html?dsId={}", flight.id);
    let result = session.request_raw(Method::GET, &path, true).await;
    let Ok(response) = result else {
        return;
    };
    let Ok(html) = response.text().await else {
        return;
    };

    let document = Html::parse_document(&html);
    let dd_selector = Selector::parse(".OlcButtonBar dl dd").expect("static selector");
    let dds: Vec<String> = document
        .select(&dd_selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect();

    flight.aircraft = dds.first().cloned();
    flight.registration = format_registration(dds.get(1).map(String::as_str));
    flight.competition_id = dds.get(2).cloned();
}

async fn fetch_igc_inner(
    session: &UcsSession,
    flight_ref: i64,
    head_only: bool,
    retry_on_redirect: bool,
) -> Result<(String, String), QueryError> {
    session.login(false).await?;
    let method = if head_only { Method::HEAD } else { Method::GET };
    let path = format!("gliding/download.html?flightId={flight_ref}");
    let response = session.request_raw(method, &path, false).await?;

    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(QueryError::Ucs(session::UcsError::TransientUpstream(
            "UCS or proxy limit exceeded, try again".into(),
        )));
    }

    if response.status() == reqwest::StatusCode::FOUND {
        if retry_on_redirect {
            session.login(true).await?;
            return Box::pin(fetch_igc_inner(session, flight_ref, head_only, false)).await;
        }
        return Err(QueryError::Ucs(session::UcsError::AuthFailure(
            "could not log in to UCS".into(),
        )));
    }

    if !response.status().is_success() {
        return Err(QueryError::Ucs(session::UcsError::PermanentUpstream(format!(
            "unexpected status fetching IGC: {}",
            response.status()
        ))));
    }

    let content_type_ok = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/igc"));
    if !content_type_ok {
        return Err(QueryError::Ucs(session::UcsError::PermanentUpstream(
            "not an IGC file".into(),
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| QueryError::Ucs(session::UcsError::TransientUpstream(format!("failed to read IGC body: {e}"))))?;

    let text = match String::from_utf8(bytes.to_vec()) {
        Ok(text) => text,
        Err(_) => decode_latin1(&bytes).ok_or(QueryError::Undecodable(flight_ref))?,
    };

    // UCS's filename may be malformed (containing slashes); derive our own.
    let filename = format!("{}.igc", flight_ref.unsigned_abs());
    Ok((filename, text))
}

fn decode_latin1(bytes: &[u8]) -> Option<String> {
    Some(bytes.iter().map(|&b| b as char).collect())
}
