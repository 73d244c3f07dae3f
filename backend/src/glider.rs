use domain::{GliderCandidate, GliderMatcher};

/// Deterministic exact-match-then-prefix stand-in for real fuzzy glider
/// matching (out of scope here). Good enough to exercise `list_flights`'
/// enrichment step in tests without a similarity-search dependency.
pub struct StubGliderMatcher {
    catalog: Vec<String>,
}

impl StubGliderMatcher {
    pub fn new(catalog: Vec<String>) -> Self {
        Self { catalog }
    }
}

impl GliderMatcher for StubGliderMatcher {
    fn closest(&self, name: &str) -> Vec<GliderCandidate> {
        let mut candidates: Vec<GliderCandidate> = self
            .catalog
            .iter()
            .filter_map(|candidate| {
                let score = if candidate.eq_ignore_ascii_case(name) {
                    1.0
                } else if candidate.to_ascii_lowercase().starts_with(&name.to_ascii_lowercase()) {
                    0.5
                } else {
                    return None;
                };
                Some(GliderCandidate { id: candidate.clone(), score })
            })
            .collect();
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_scores_highest() {
        let matcher = StubGliderMatcher::new(vec!["LS4".to_string(), "LS4b".to_string()]);
        let matches = matcher.closest("LS4");
        assert_eq!(matches[0].id, "LS4");
        assert_eq!(matches[0].score, 1.0);
    }

    #[test]
    fn unknown_name_yields_no_candidates() {
        let matcher = StubGliderMatcher::new(vec!["LS4".to_string()]);
        assert!(matcher.closest("DG-300").is_empty());
    }
}
