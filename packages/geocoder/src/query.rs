//! Query construction for forward geocoding strategies.
//!
//! Both builders take the strategy's `(field, value)` pairs, already
//! restricted to the strategy's fields and stripped of empty values, and
//! produce a complete [`SelectQuery`]. With no pairs they fall back to a
//! match-all query.

use solr_geocoder_models::{MatchKind, StrategyDefinition};
use solr_geocoder_solr::SelectQuery;

use crate::config::FuzzyTuning;
use crate::fuzzy::fuzzy_fragment;

const MATCH_ALL: &str = "*:*";

/// Quotes a value as a Lucene phrase, escaping `\` and `"`.
#[must_use]
pub fn quote_phrase(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Builds a query requiring every field to equal its value exactly.
#[must_use]
pub fn build_exact_query(fields: &[(&str, &str)], rows: u32) -> SelectQuery {
    let clauses: Vec<String> = fields
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(field, value)| format!("{field}:{}", quote_phrase(value)))
        .collect();

    SelectQuery::new(join_and(&clauses))
        .def_type("edismax")
        .rows(rows)
}

/// Builds a query where every word of every field may match approximately.
///
/// Fields whose value yields no words (e.g. `"--"`) are left out entirely.
#[must_use]
pub fn build_fuzzy_query(fields: &[(&str, &str)], rows: u32, tuning: &FuzzyTuning) -> SelectQuery {
    let clauses: Vec<String> = fields
        .iter()
        .map(|(field, value)| fuzzy_fragment(field, value))
        .filter(|fragment| !fragment.is_empty())
        .collect();

    SelectQuery::new(join_and(&clauses))
        .def_type("edismax")
        .rows(rows)
        .param("ps", tuning.phrase_slop.to_string())
        .param("mm", tuning.minimum_match.clone())
        .param("tie", tuning.tie_breaker.to_string())
        .param("sow", "true")
}

/// Builds the query for one cascade strategy.
#[must_use]
pub fn build_strategy_query(
    strategy: &StrategyDefinition,
    fields: &[(&str, &str)],
    rows: u32,
    tuning: &FuzzyTuning,
) -> SelectQuery {
    let rows = strategy.effective_rows(rows);
    match strategy.match_kind {
        MatchKind::Exact => build_exact_query(fields, rows),
        MatchKind::Fuzzy => build_fuzzy_query(fields, rows, tuning),
    }
}

fn join_and(clauses: &[String]) -> String {
    if clauses.is_empty() {
        MATCH_ALL.to_string()
    } else {
        clauses.join(" AND ")
    }
}
