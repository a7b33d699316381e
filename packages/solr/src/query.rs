//! Structured select queries.
//!
//! A [`SelectQuery`] carries everything the geocoder needs to express:
//! the query string, the row count, the field projection, sorting, an
//! optional spatial radius filter, and free-form tuning parameters such as
//! edismax's `mm`/`ps`/`tie`.

/// Spatial radius filter around a point.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFilter {
    /// Name of the location field in the index (e.g. `"koordinate"`).
    pub field: String,
    /// Latitude of the center (WGS84).
    pub lat: f64,
    /// Longitude of the center (WGS84).
    pub lon: f64,
    /// Radius in kilometres.
    pub radius_km: f64,
}

impl SpatialFilter {
    /// The center as Solr's `"lat,lon"` point syntax.
    #[must_use]
    pub fn point(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }

    /// The `geofilt` filter query restricting hits to the circle.
    #[must_use]
    pub fn geofilt(&self) -> String {
        format!(
            "{{!geofilt sfield={} pt={} d={}}}",
            self.field,
            self.point(),
            self.radius_km
        )
    }
}

/// A select request against the index.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Main query string.
    pub q: String,
    /// Query parser (e.g. `"edismax"`).
    pub def_type: Option<String>,
    /// Number of rows to return.
    pub rows: u32,
    /// Field projection, including pseudo-fields like `score`.
    pub fields: Vec<String>,
    /// Sort clause.
    pub sort: Option<String>,
    /// Spatial radius filter.
    pub spatial: Option<SpatialFilter>,
    /// Extra request parameters, sent in order.
    pub params: Vec<(String, String)>,
}

impl SelectQuery {
    /// Creates a query for `q` that projects every stored field plus the
    /// relevance score.
    #[must_use]
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            def_type: None,
            rows: 10,
            fields: vec!["*".to_string(), "score".to_string()],
            sort: None,
            spatial: None,
            params: Vec::new(),
        }
    }

    /// A query matching every document.
    #[must_use]
    pub fn match_all() -> Self {
        Self::new("*:*")
    }

    /// Sets the row count.
    #[must_use]
    pub fn rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    /// Sets the query parser.
    #[must_use]
    pub fn def_type(mut self, def_type: impl Into<String>) -> Self {
        self.def_type = Some(def_type.into());
        self
    }

    /// Replaces the field projection.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the sort clause.
    #[must_use]
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Restricts hits to a radius around a point.
    #[must_use]
    pub fn spatial(mut self, spatial: SpatialFilter) -> Self {
        self.spatial = Some(spatial);
        self
    }

    /// Adds a free-form request parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Flattens the query into Solr request parameters.
    ///
    /// The spatial filter becomes an `fq` plus the `sfield`/`pt` pair that
    /// `geodist()` reads.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("q".to_string(), self.q.clone()),
            ("rows".to_string(), self.rows.to_string()),
            ("wt".to_string(), "json".to_string()),
        ];

        if let Some(def_type) = &self.def_type {
            out.push(("defType".to_string(), def_type.clone()));
        }
        if !self.fields.is_empty() {
            out.push(("fl".to_string(), self.fields.join(",")));
        }
        if let Some(sort) = &self.sort {
            out.push(("sort".to_string(), sort.clone()));
        }
        if let Some(spatial) = &self.spatial {
            out.push(("fq".to_string(), spatial.geofilt()));
            out.push(("sfield".to_string(), spatial.field.clone()));
            out.push(("pt".to_string(), spatial.point()));
        }

        out.extend(self.params.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn default_projection_includes_score() {
        let params = SelectQuery::new("plz:\"53111\"").rows(5).to_params();
        assert_eq!(values(&params, "q"), vec!["plz:\"53111\""]);
        assert_eq!(values(&params, "rows"), vec!["5"]);
        assert_eq!(values(&params, "fl"), vec!["*,score"]);
        assert_eq!(values(&params, "wt"), vec!["json"]);
        assert!(values(&params, "defType").is_empty());
    }

    #[test]
    fn spatial_filter_emits_geofilt_and_point() {
        let query = SelectQuery::match_all().spatial(SpatialFilter {
            field: "koordinate".to_string(),
            lat: 50.73,
            lon: 7.1,
            radius_km: 2.0,
        });
        let params = query.to_params();
        assert_eq!(
            values(&params, "fq"),
            vec!["{!geofilt sfield=koordinate pt=50.73,7.1 d=2}"]
        );
        assert_eq!(values(&params, "sfield"), vec!["koordinate"]);
        assert_eq!(values(&params, "pt"), vec!["50.73,7.1"]);
    }

    #[test]
    fn extra_params_are_kept_in_order() {
        let query = SelectQuery::match_all()
            .def_type("edismax")
            .param("ps", "2")
            .param("mm", "2<75%");
        let params = query.to_params();
        assert_eq!(values(&params, "mm"), vec!["2<75%"]);
        let tail: Vec<&str> = params[params.len() - 2..]
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(tail, vec!["ps", "mm"]);
        assert_eq!(values(&params, "defType"), vec!["edismax"]);
    }
}
