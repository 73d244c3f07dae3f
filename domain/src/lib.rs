//! Shared domain types for the UCS/DFS bridging pipeline.
//!
//! These are the wire-ish shapes produced by UCS and enriched before being
//! handed to the DFS uploader. Kept dependency-light so `cache`, `session`,
//! `scheduler` and `queries` can all depend on it without pulling in HTTP or
//! scheduling machinery.

use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type FlightId = u64;
/// Signed: UCS embeds the map reference as a signed integer in `mapHref`.
pub type FlightRef = i64;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CoPilot {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "surName")]
    pub sur_name: String,
}

impl CoPilot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.sur_name)
    }
}

/// A single flight as returned by the UCS flightbook endpoint, enriched by
/// `queries::list_flights` / `queries::scrape_flight`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Flight {
    pub id: FlightId,
    pub airplane: String,
    #[serde(rename = "dateOfFlight")]
    pub date_of_flight_ms: i64,
    #[serde(rename = "distanceInKm")]
    pub distance_in_km: f64,
    #[serde(rename = "speedInKmH")]
    pub speed_in_km_h: f64,
    #[serde(default)]
    pub copilot: Option<CoPilot>,

    // --- enrichment, absent on the raw UCS response ---
    #[serde(default)]
    pub airplane_matched: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub co_pilot_name: Option<String>,
    #[serde(default)]
    pub aircraft: Option<String>,
    #[serde(default)]
    pub registration: Option<String>,
    #[serde(default)]
    pub competition_id: Option<String>,
    #[serde(default)]
    pub pilot_comment: Option<String>,
}

/// A candidate glider match returned by the (out-of-scope) glider matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct GliderCandidate {
    pub id: String,
    pub score: f64,
}

/// Outcome of an upload attempt, as reported through the status store.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub status: Option<String>,
    pub result: Option<String>,
}

/// Fuzzy-matches a free-text glider/airplane name against a reference
/// catalog. The real implementation (out of scope here) backs this with a
/// proper similarity search; `queries::list_flights` only needs the trait
/// seam to enrich each flight with its best match.
pub trait GliderMatcher: Send + Sync {
    fn closest(&self, name: &str) -> Vec<GliderCandidate>;
}
