//! Result normalization and quality scoring.
//!
//! Reshapes a raw Solr document into a [`NormalizedResult`]:
//!
//! - stored fields become `attributes` (multi-valued fields collapse to
//!   their first element);
//! - the `additional_information` blob, a JSON object serialized into one
//!   string field, is parsed and merged over those attributes;
//! - every queried field gets a 0–100 similarity score against the stored
//!   value (the best one, for multi-valued fields);
//! - Solr's `score` and a computed `distance_km` are lifted into the
//!   envelope.

use std::collections::BTreeMap;

use serde_json::Value;
use solr_geocoder_models::{NormalizedResult, QualityMap};
use solr_geocoder_solr::Document;

use crate::GeocodeError;

/// Field holding the serialized side-channel attributes.
pub const ADDITIONAL_INFORMATION: &str = "additional_information";

/// Pseudo-field carrying the computed spatial distance.
pub const DISTANCE_FIELD: &str = "distance_km";

/// Document keys never copied into `attributes`.
const ENVELOPE_KEYS: &[&str] = &[
    "id",
    "score",
    "quality",
    DISTANCE_FIELD,
    "_version_",
    ADDITIONAL_INFORMATION,
];

/// Case-insensitive similarity between two strings, scaled to 0–100 and
/// rounded up.
#[must_use]
pub fn similarity(input: &str, stored: &str) -> u8 {
    let ratio = strsim::normalized_levenshtein(&input.to_lowercase(), &stored.to_lowercase());
    // Absorb float noise like 90.00000000000001 before rounding up.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = (ratio * 100.0 - 1e-9).ceil().clamp(0.0, 100.0) as u8;
    score
}

/// Best similarity between `input` and a stored field value.
///
/// Returns `None` if the stored value is `null` or not a scalar/list of
/// scalars. An empty list scores 0.
#[must_use]
pub fn best_similarity(input: &str, stored: &Value) -> Option<u8> {
    match stored {
        Value::Array(values) => values.iter().try_fold(0u8, |best, value| {
            solr_geocoder_models::scalar_to_string(value)
                .map(|s| best.max(similarity(input, &s)))
        }),
        other => solr_geocoder_models::scalar_to_string(other).map(|s| similarity(input, &s)),
    }
}

/// Normalizes one document.
///
/// `queried` holds the `(field, value)` pairs the matching strategy actually
/// sent; each gets a score in the quality map.
///
/// # Errors
///
/// Returns [`GeocodeError::MalformedDocument`] if the document has no `id`,
/// lacks (or holds an unusable value for) a queried field, or carries an
/// `additional_information` blob that is not a JSON object.
pub fn normalize(doc: &Document, queried: &[(&str, &str)]) -> Result<NormalizedResult, GeocodeError> {
    let id = doc
        .get("id")
        .cloned()
        .ok_or_else(|| malformed("id", "document has no id"))?;

    let mut attributes: serde_json::Map<String, Value> = doc
        .iter()
        .filter(|(key, _)| !ENVELOPE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), first_value(value)))
        .collect();

    if let Some(blob) = doc.get(ADDITIONAL_INFORMATION) {
        for (key, value) in parse_additional_information(blob)? {
            if ENVELOPE_KEYS.contains(&key.as_str()) {
                log::debug!("Ignoring reserved key {key:?} in {ADDITIONAL_INFORMATION}");
                continue;
            }
            attributes.insert(key, value);
        }
    }

    let mut fields = BTreeMap::new();
    for (field, input) in queried {
        let stored = doc
            .get(*field)
            .ok_or_else(|| malformed(field, "queried field missing from document"))?;
        let score = best_similarity(input, stored)
            .ok_or_else(|| malformed(field, format!("unusable stored value {stored}")))?;
        fields.insert((*field).to_string(), score);
    }

    Ok(NormalizedResult {
        id,
        attributes,
        quality: QualityMap {
            fields,
            solr_score: doc.get("score").and_then(as_f64),
        },
        distance_km: doc.get(DISTANCE_FIELD).and_then(as_f64),
    })
}

fn malformed(field: &str, message: impl Into<String>) -> GeocodeError {
    GeocodeError::MalformedDocument {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Collapses a multi-valued field to its first element.
fn first_value(value: &Value) -> Value {
    match value {
        Value::Array(values) => values.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// Parses the side-channel blob.
///
/// The blob is normally a string holding a JSON object; an already
/// decoded object and a single-element list of strings (multi-valued
/// schema) are accepted too.
fn parse_additional_information(
    blob: &Value,
) -> Result<serde_json::Map<String, Value>, GeocodeError> {
    let parsed = match blob {
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .map_err(|e| malformed(ADDITIONAL_INFORMATION, e.to_string()))?,
        Value::Array(values) if values.len() == 1 => {
            return parse_additional_information(&values[0]);
        }
        other => other.clone(),
    };

    match parsed {
        Value::Object(map) => Ok(map),
        other => Err(malformed(
            ADDITIONAL_INFORMATION,
            format!("expected a JSON object, got {other}"),
        )),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn identical_values_score_100_case_insensitively() {
        assert_eq!(similarity("Hauptstrasse", "Hauptstrasse"), 100);
        assert_eq!(similarity("BONN", "bonn"), 100);
        assert_eq!(similarity("", ""), 100);
    }

    #[test]
    fn different_values_score_below_100() {
        let score = similarity("Hauptstr", "Hauptstrasse");
        assert!(score > 50 && score < 100, "score was {score}");
        assert_eq!(similarity("abc", "xyz"), 0);
    }

    #[test]
    fn scores_round_up() {
        // One edit in a three-letter word leaves 2/3 similarity.
        assert_eq!(similarity("abc", "abd"), 67);
    }

    #[test]
    fn multi_valued_field_keeps_best_score() {
        let stored = json!(["Bad Godesberg", "Bonn"]);
        assert_eq!(best_similarity("bonn", &stored), Some(100));
        assert_eq!(best_similarity("bonn", &json!([])), Some(0));
        assert_eq!(best_similarity("bonn", &Value::Null), None);
        assert_eq!(best_similarity("53111", &json!(53111)), Some(100));
    }

    #[test]
    fn flattens_additional_information() {
        let raw = doc(json!({
            "id": "42",
            "plz": "53111",
            "ort": ["Bonn"],
            "_version_": 1,
            "additional_information": "{\"gemarkung\": \"Bonn\", \"daid\": \"DENW123\"}",
            "score": 3.5,
        }));
        let result = normalize(&raw, &[("plz", "53111")]).unwrap();
        assert_eq!(result.id, json!("42"));
        assert_eq!(result.attributes["gemarkung"], "Bonn");
        assert_eq!(result.attributes["daid"], "DENW123");
        assert_eq!(result.attributes["ort"], "Bonn");
        assert!(!result.attributes.contains_key(ADDITIONAL_INFORMATION));
        assert!(!result.attributes.contains_key("_version_"));
        assert!(!result.attributes.contains_key("score"));
        assert_eq!(result.quality.fields.get("plz"), Some(&100));
        assert_eq!(result.quality.solr_score, Some(3.5));
        assert_eq!(result.distance_km, None);
    }

    #[test]
    fn blob_values_override_stored_fields_but_not_envelope() {
        let raw = doc(json!({
            "id": "1",
            "ort": "Bonn",
            "additional_information": "{\"ort\": \"Bonn-Zentrum\", \"id\": \"evil\"}",
        }));
        let result = normalize(&raw, &[]).unwrap();
        assert_eq!(result.attributes["ort"], "Bonn-Zentrum");
        assert_eq!(result.id, json!("1"));
        assert!(!result.attributes.contains_key("id"));
    }

    #[test]
    fn malformed_blob_is_rejected() {
        let raw = doc(json!({"id": "1", "additional_information": "[1, 2]"}));
        assert!(matches!(
            normalize(&raw, &[]),
            Err(GeocodeError::MalformedDocument { field, .. }) if field == ADDITIONAL_INFORMATION
        ));
    }

    #[test]
    fn missing_queried_field_is_rejected() {
        let raw = doc(json!({"id": "1", "plz": "53111"}));
        assert!(matches!(
            normalize(&raw, &[("plz", "53111"), ("strasse", "Hauptstrasse")]),
            Err(GeocodeError::MalformedDocument { field, .. }) if field == "strasse"
        ));
    }

    #[test]
    fn missing_optional_fields_are_fine() {
        let raw = doc(json!({"id": 7}));
        let result = normalize(&raw, &[]).unwrap();
        assert_eq!(result.id, json!(7));
        assert!(result.attributes.is_empty());
        assert!(result.quality.fields.is_empty());
        assert_eq!(result.quality.solr_score, None);
    }

    #[test]
    fn lifts_distance_into_envelope() {
        let raw = doc(json!({"id": "1", "distance_km": "0.42", "koordinate": "50.73,7.1"}));
        let result = normalize(&raw, &[]).unwrap();
        assert_eq!(result.distance_km, Some(0.42));
        assert!(!result.attributes.contains_key(DISTANCE_FIELD));
        assert_eq!(result.attributes["koordinate"], "50.73,7.1");
    }
}
