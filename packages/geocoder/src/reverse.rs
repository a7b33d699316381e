//! Reverse geocoding: nearest address records around a point.
//!
//! A single radius search (`geofilt`) sorted by `geodist()`, with the
//! computed distance projected as `distance_km`. No cascade and no text
//! scoring.

use std::cmp::Ordering;

use solr_geocoder_models::{NormalizedResult, ReverseOutcome, ReverseQuery};
use solr_geocoder_solr::{SelectQuery, SpatialFilter};

use crate::config::ReverseLimits;
use crate::normalize::{DISTANCE_FIELD, normalize};
use crate::{GeocodeError, Geocoder};

/// Validates numeric reverse-geocoding inputs.
///
/// `rows` is clamped into the configured range; `None` values take the
/// configured defaults.
///
/// # Errors
///
/// Returns [`GeocodeError::Validation`] if a coordinate is not finite or
/// out of range, or the radius is not a positive number.
pub fn validate_reverse_query(
    lat: f64,
    lon: f64,
    rows: Option<i64>,
    radius_km: Option<f64>,
    limits: &ReverseLimits,
) -> Result<ReverseQuery, GeocodeError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(GeocodeError::validation(format!("Invalid lat: {lat}")));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(GeocodeError::validation(format!("Invalid lon: {lon}")));
    }

    let radius_km = radius_km.unwrap_or(limits.default_radius_km);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(GeocodeError::validation("max_radius must be > 0 (km)"));
    }

    Ok(ReverseQuery {
        lat,
        lon,
        rows: limits.clamp(rows),
        radius_km,
    })
}

/// Parses and validates raw (string) reverse-geocoding inputs.
///
/// Blank optional values count as absent.
///
/// # Errors
///
/// Returns [`GeocodeError::Validation`] if a coordinate is missing or not
/// a number, the row count is not a whole number, or any value fails
/// [`validate_reverse_query`].
pub fn parse_reverse_query(
    lat: Option<&str>,
    lon: Option<&str>,
    rows: Option<&str>,
    radius_km: Option<&str>,
    limits: &ReverseLimits,
) -> Result<ReverseQuery, GeocodeError> {
    let (Some(lat), Some(lon)) = (non_blank(lat), non_blank(lon)) else {
        return Err(GeocodeError::validation(
            "Missing coordinates: require 'lat' and 'lon'",
        ));
    };

    let lat = parse_number::<f64>(lat, "lat")?;
    let lon = parse_number::<f64>(lon, "lon")?;
    let rows = non_blank(rows).map(parse_row_count).transpose()?;
    let radius_km = non_blank(radius_km)
        .map(|r| parse_number::<f64>(r, "max_radius"))
        .transpose()?;

    validate_reverse_query(lat, lon, rows, radius_km, limits)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Row counts may arrive as integral floats (`"3.0"`) from JSON clients.
#[allow(clippy::cast_possible_truncation)]
fn parse_row_count(raw: &str) -> Result<i64, GeocodeError> {
    if let Ok(rows) = raw.parse::<i64>() {
        return Ok(rows);
    }
    match parse_number::<f64>(raw, "max_results")? {
        rows if rows.is_finite() && rows.fract() == 0.0 => Ok(rows as i64),
        _ => Err(GeocodeError::validation(format!(
            "Invalid max_results: {raw:?}"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, GeocodeError> {
    raw.parse()
        .map_err(|_| GeocodeError::validation(format!("Invalid {name}: {raw:?}")))
}

/// Builds the radius search for `query` against `spatial_field`.
#[must_use]
pub fn build_reverse_query(query: &ReverseQuery, spatial_field: &str) -> SelectQuery {
    SelectQuery::match_all()
        .rows(query.rows)
        .spatial(SpatialFilter {
            field: spatial_field.to_string(),
            lat: query.lat,
            lon: query.lon,
            radius_km: query.radius_km,
        })
        .sort("geodist() asc")
        .fields(["*", "score", "distance_km:geodist()"])
}

fn by_distance(a: &NormalizedResult, b: &NormalizedResult) -> Ordering {
    let a = a.distance_km.unwrap_or(f64::INFINITY);
    let b = b.distance_km.unwrap_or(f64::INFINITY);
    a.total_cmp(&b)
}

impl Geocoder {
    /// Parses raw inputs and runs [`Geocoder::resolve_reverse`].
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Validation`] for bad inputs (no request is
    /// sent), otherwise the errors of [`Geocoder::resolve_reverse`].
    pub async fn reverse_geocode(
        &self,
        lat: Option<&str>,
        lon: Option<&str>,
        rows: Option<&str>,
        radius_km: Option<&str>,
    ) -> Result<ReverseOutcome, GeocodeError> {
        let query = parse_reverse_query(lat, lon, rows, radius_km, &self.config.reverse)?;
        self.resolve_reverse(&query).await
    }

    /// Finds the records nearest to the query point, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Upstream`] if the request fails or
    /// [`GeocodeError::MalformedDocument`] if a hit has no `id`.
    pub async fn resolve_reverse(
        &self,
        query: &ReverseQuery,
    ) -> Result<ReverseOutcome, GeocodeError> {
        let select = build_reverse_query(query, &self.config.reverse.spatial_field);
        log::debug!(
            "Reverse lookup at {},{} within {} km (rows {})",
            query.lat,
            query.lon,
            query.radius_km,
            query.rows
        );

        let response = self.client.select(&select).await.map_err(|e| {
            if e.is_timeout() {
                log::warn!("Reverse lookup timed out: {e}");
            } else {
                log::warn!("Reverse lookup failed: {e}");
            }
            GeocodeError::Upstream(e)
        })?;

        let mut results = response
            .docs
            .iter()
            .map(|doc| normalize(doc, &[]))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(missing) = results.iter().position(|r| r.distance_km.is_none()) {
            log::warn!("Reverse hit {missing} has no {DISTANCE_FIELD}");
        }
        results.sort_by(by_distance);

        log::info!("Reverse lookup matched {} document(s)", results.len());
        Ok(ReverseOutcome::from_results(results))
    }
}
