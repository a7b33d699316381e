//! Strategy cascade for forward geocoding.
//!
//! Tries each configured strategy in order, restricted to that strategy's
//! fields, and returns the normalized hits of the first one that finds
//! anything. A zero-hit strategy falls through to the next; a failed call
//! does not.

use solr_geocoder_models::{AddressQuery, ForwardResult};

use crate::normalize::normalize;
use crate::query::build_strategy_query;
use crate::{GeocodeError, Geocoder};

impl Geocoder {
    /// Forward geocodes `input`, clamping `rows` to the configured limits
    /// (`None` means the configured default).
    ///
    /// # Errors
    ///
    /// Same as [`Geocoder::resolve`].
    pub async fn forward_geocode(
        &self,
        input: &AddressQuery,
        rows: Option<i64>,
    ) -> Result<ForwardResult, GeocodeError> {
        let rows = self.config.forward.clamp(rows);
        self.resolve(input, rows).await
    }

    /// Runs the strategy cascade for `input`, asking for at most `rows`
    /// documents per strategy.
    ///
    /// Every strategy is sent, even when `input` leaves it with no usable
    /// clause; its builder then falls back to a match-all query.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Validation`] if no anchor field is present
    /// (no request is sent), [`GeocodeError::Upstream`] if any strategy's
    /// request fails, and [`GeocodeError::MalformedDocument`] if a hit lacks
    /// a queried field.
    pub async fn resolve(
        &self,
        input: &AddressQuery,
        rows: u32,
    ) -> Result<ForwardResult, GeocodeError> {
        if !input.has_any(&self.config.anchors) {
            return Err(GeocodeError::validation(format!(
                "Geocoding requires at least one of: {}",
                self.config.anchors.join(" or ")
            )));
        }

        for strategy in &self.config.strategies {
            let restricted = input.clone().retain_fields(&strategy.fields);
            let fields = self.ordered_fields(&restricted);

            let query = build_strategy_query(strategy, &fields, rows, &self.config.fuzzy);
            log::debug!(
                "Trying {} strategy {}: q={}",
                strategy.match_kind,
                strategy.name,
                query.q
            );

            let response = self.client.select(&query).await.map_err(|e| {
                if e.is_timeout() {
                    log::warn!("Strategy {} timed out: {e}", strategy.name);
                } else {
                    log::warn!("Strategy {} failed: {e}", strategy.name);
                }
                GeocodeError::Upstream(e)
            })?;

            if response.docs.is_empty() {
                continue;
            }

            let results = response
                .docs
                .iter()
                .map(|doc| normalize(doc, &fields))
                .collect::<Result<Vec<_>, _>>()?;

            log::info!(
                "Strategy {} matched {} document(s) ({} total)",
                strategy.name,
                results.len(),
                response.num_found
            );
            return Ok(ForwardResult::matched(&strategy.name, results));
        }

        log::info!("No strategy matched");
        Ok(ForwardResult::no_match())
    }

    /// The supplied `(field, value)` pairs of `input`, in configured param
    /// order.
    fn ordered_fields<'a>(&'a self, input: &'a AddressQuery) -> Vec<(&'a str, &'a str)> {
        self.config
            .params
            .iter()
            .filter_map(|param| input.get(param).map(|value| (param.as_str(), value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use solr_geocoder_models::AddressQuery;

    use crate::GeocodeError;
    use crate::testing::{Reply, ScriptedClient, geocoder, param};

    fn address(pairs: &[(&str, &str)]) -> AddressQuery {
        AddressQuery::from_pairs(pairs.iter().copied())
    }

    #[tokio::test]
    async fn missing_anchor_is_rejected_without_calling_solr() {
        let client = ScriptedClient::new(vec![]);
        let geocoder = geocoder(&client);

        let err = geocoder
            .forward_geocode(&address(&[("plz", ""), ("ort", "")]), Some(10))
            .await
            .unwrap_err();

        assert!(matches!(err, GeocodeError::Validation { .. }));
        assert_eq!(
            err.to_string(),
            "Geocoding requires at least one of: plz or ort"
        );
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn street_without_anchor_is_rejected() {
        let client = ScriptedClient::new(vec![]);
        let err = geocoder(&client)
            .resolve(&address(&[("strasse", "Hauptstrasse"), ("hausnummer", "5")]), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, GeocodeError::Validation { .. }));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn exact_all_match_scores_every_queried_field() {
        let client = ScriptedClient::new(vec![Reply::Docs(vec![json!({
            "id": "1",
            "plz": "53111",
            "ort": "Bonn",
            "strasse": "Hauptstrasse",
            "hausnummer": "5",
            "score": 12.5,
        })])]);
        let input = address(&[
            ("plz", "53111"),
            ("ort", ""),
            ("strasse", "Hauptstrasse"),
            ("hausnummer", "5"),
        ]);

        let result = geocoder(&client).resolve(&input, 10).await.unwrap();

        assert_eq!(result.strategy.as_deref(), Some("exact_all"));
        assert_eq!(result.count, 1);
        let quality = &result.results[0].quality;
        assert_eq!(quality.fields.get("plz"), Some(&100));
        assert_eq!(quality.fields.get("strasse"), Some(&100));
        assert_eq!(quality.fields.get("hausnummer"), Some(&100));
        assert_eq!(quality.fields.get("ort"), None);
        assert_eq!(quality.solr_score, Some(12.5));

        assert_eq!(client.calls(), 1);
        assert_eq!(
            client.queries()[0].q,
            "plz:\"53111\" AND strasse:\"Hauptstrasse\" AND hausnummer:\"5\""
        );
    }

    #[tokio::test]
    async fn falls_through_empty_strategies_in_order() {
        let client = ScriptedClient::new(vec![
            Reply::Docs(vec![]),
            Reply::Docs(vec![]),
            Reply::Docs(vec![]),
            Reply::Docs(vec![]),
            Reply::Docs(vec![
                json!({"id": "b", "ort": "Bonn", "strasse": "Hauptstrasse", "score": 2.0}),
                json!({"id": "a", "ort": "Bonn", "strasse": "Hauptstr.", "score": 1.0}),
            ]),
        ]);
        let input = address(&[
            ("plz", ""),
            ("ort", "Bonn"),
            ("strasse", "Hauptstr"),
            ("hausnummer", ""),
        ]);

        let result = geocoder(&client).resolve(&input, 10).await.unwrap();

        assert_eq!(result.strategy.as_deref(), Some("fuzzy_ort_strasse"));
        assert_eq!(result.count, 2);
        let ids: Vec<_> = result.results.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![json!("b"), json!("a")]);

        let queries = client.queries();
        assert_eq!(queries.len(), 5);
        assert_eq!(queries[0].q, "ort:\"Bonn\" AND strasse:\"Hauptstr\"");
        assert_eq!(queries[4].q, "ort:Bonn~1 AND strasse:Hauptstr~2");
        assert_eq!(param(&queries[4], "mm"), Some("2<75%"));
    }

    #[tokio::test]
    async fn stops_at_first_strategy_with_results() {
        let client = ScriptedClient::new(vec![
            Reply::Docs(vec![]),
            Reply::Docs(vec![json!({"id": "1", "plz": "53111", "ort": "Bonn", "strasse": "Markt"})]),
            Reply::Docs(vec![json!({"id": "never"})]),
        ]);
        let input = address(&[("plz", "53111"), ("ort", "Bonn"), ("strasse", "Markt")]);

        let result = geocoder(&client).resolve(&input, 5).await.unwrap();

        assert_eq!(result.strategy.as_deref(), Some("exact_no_hausnummer"));
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn no_match_when_every_strategy_is_empty() {
        let client = ScriptedClient::new(vec![]);
        let input = address(&[("plz", "99999"), ("strasse", "Nirgendweg")]);

        let result = geocoder(&client).resolve(&input, 5).await.unwrap();

        assert_eq!(result.strategy, None);
        assert_eq!(result.count, 0);
        assert!(result.results.is_empty());
        assert_eq!(client.calls(), 6);
    }

    #[tokio::test]
    async fn upstream_failure_stops_the_cascade() {
        let client = ScriptedClient::new(vec![
            Reply::Docs(vec![]),
            Reply::Unavailable,
            Reply::Docs(vec![json!({"id": "never"})]),
        ]);
        let input = address(&[("ort", "Bonn"), ("strasse", "Markt")]);

        let err = geocoder(&client).resolve(&input, 5).await.unwrap_err();

        assert!(matches!(err, GeocodeError::Upstream(_)));
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn strategy_without_usable_input_still_runs() {
        let client = ScriptedClient::new(vec![]);
        // Only plz: fuzzy_ort_strasse has nothing to query and matches all.
        let input = address(&[("plz", "53111")]);

        let result = geocoder(&client).resolve(&input, 5).await.unwrap();

        assert_eq!(result.strategy, None);
        let queries = client.queries();
        assert_eq!(queries.len(), 6);
        assert_eq!(queries[4].q, "*:*");
        assert_eq!(queries[5].q, "plz:53111~1");
    }

    #[tokio::test]
    async fn separator_only_value_counts_as_absent_in_fuzzy_strategies() {
        let dashes = ScriptedClient::new(vec![]);
        let absent = ScriptedClient::new(vec![]);

        geocoder(&dashes)
            .resolve(&address(&[("plz", "99999"), ("strasse", "--")]), 5)
            .await
            .unwrap();
        geocoder(&absent)
            .resolve(&address(&[("plz", "99999")]), 5)
            .await
            .unwrap();

        let dashes: Vec<String> = dashes.queries().into_iter().map(|q| q.q).collect();
        let absent: Vec<String> = absent.queries().into_iter().map(|q| q.q).collect();
        assert_eq!(dashes.len(), 6);
        assert_eq!(dashes[0], "plz:\"99999\" AND strasse:\"--\"");
        assert_eq!(dashes[2..], absent[2..]);
        assert_eq!(
            dashes[2..],
            ["plz:99999~1", "plz:99999~1", "*:*", "plz:99999~1"]
        );
    }

    #[tokio::test]
    async fn forward_geocode_clamps_rows() {
        let client = ScriptedClient::new(vec![]);
        let geocoder = geocoder(&client);
        let input = address(&[("ort", "Bonn")]);

        geocoder.forward_geocode(&input, Some(50)).await.unwrap();
        geocoder.forward_geocode(&input, Some(0)).await.unwrap();
        geocoder.forward_geocode(&input, None).await.unwrap();

        let rows: Vec<u32> = client.queries().iter().map(|q| q.rows).collect();
        assert_eq!(rows.len(), 18);
        assert!(rows[..6].iter().all(|&r| r == 10));
        assert!(rows[6..12].iter().all(|&r| r == 1));
        assert!(rows[12..].iter().all(|&r| r == 10));
    }

    #[tokio::test]
    async fn malformed_hit_is_an_error() {
        let client = ScriptedClient::new(vec![Reply::Docs(vec![json!({"id": "1"})])]);
        let input = address(&[("ort", "Bonn")]);

        let err = geocoder(&client).resolve(&input, 5).await.unwrap_err();

        assert!(matches!(err, GeocodeError::MalformedDocument { field, .. } if field == "ort"));
    }
}
