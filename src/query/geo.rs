//! Geospatial conditions.

use crate::document::Document;
use crate::geo::{
    DistanceUnit, GeoPoint, distance_to_polyline_km, haversine_km, point_in_polygon, resolve_point,
};
use crate::query::dsl::{GeoDistance, GeoLine, GeoMultiPolygon, GeoPolygon};
use crate::query::{Condition, EvalContext, Evaluation};

impl Condition for GeoDistance {
    fn evaluate(&self, doc: &Document, _ctx: &EvalContext<'_>) -> Evaluation {
        let Some(point) = resolve_point(doc, &self.field) else {
            return Evaluation::NO_MATCH;
        };
        let center = GeoPoint::new(self.lat, self.lon);
        let distance = DistanceUnit::parse(&self.unit).from_km(haversine_km(&point, &center));
        Evaluation::from_bool(distance <= self.distance)
    }
}

impl Condition for GeoPolygon {
    fn evaluate(&self, doc: &Document, _ctx: &EvalContext<'_>) -> Evaluation {
        let matched = resolve_point(doc, &self.field)
            .is_some_and(|point| point_in_polygon(&point, &self.points));
        Evaluation::from_bool(matched)
    }
}

impl Condition for GeoMultiPolygon {
    fn evaluate(&self, doc: &Document, _ctx: &EvalContext<'_>) -> Evaluation {
        let Some(point) = resolve_point(doc, &self.field) else {
            return Evaluation::NO_MATCH;
        };
        let matched = self
            .polygons
            .iter()
            .filter(|polygon| polygon.len() >= 3)
            .any(|polygon| point_in_polygon(&point, polygon));
        Evaluation::from_bool(matched)
    }
}

impl Condition for GeoLine {
    fn evaluate(&self, doc: &Document, _ctx: &EvalContext<'_>) -> Evaluation {
        if self.line.len() < 2 {
            return Evaluation::NO_MATCH;
        }
        let Some(point) = resolve_point(doc, &self.field) else {
            return Evaluation::NO_MATCH;
        };
        let matched = distance_to_polyline_km(&point, &self.line)
            .map(|km| DistanceUnit::parse(&self.unit).from_km(km))
            .is_some_and(|distance| distance <= self.distance);
        Evaluation::from_bool(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::{Fixture, case, doc};
    use serde_json::json;

    fn matches(condition: serde_json::Value, d: serde_json::Value) -> bool {
        let fixture = Fixture::new();
        case(condition).evaluate(&doc(d), &fixture.ctx()).matched
    }

    #[test]
    fn test_geo_distance() {
        let radius = json!({"geoDistance": {"field": "loc", "lat": 40.0, "lon": -74.0, "distance": 50, "unit": "km"}});
        assert!(matches(radius.clone(), json!({"loc": {"lat": 40.0, "lon": -74.0}})));
        assert!(!matches(radius.clone(), json!({"loc": {"lat": 41.0, "lon": -74.0}})));
        assert!(matches(radius.clone(), json!({"loc": "40.1,-74.0"})));
        assert!(!matches(radius, json!({"loc": "nowhere"})));

        let miles = json!({"geoDistance": {"field": "loc", "lat": 40.0, "lon": -74.0, "distance": 70, "unit": "mi"}});
        assert!(matches(miles, json!({"loc": {"lat": "41.0", "lon": "-74.0"}})));
    }

    #[test]
    fn test_polygons() {
        let square = json!([[0, 0], [10, 0], [10, 10], [0, 10]]);
        let polygon = json!({"geoPolygon": {"field": "p", "points": square}});
        assert!(matches(polygon.clone(), json!({"p": {"lat": 5, "lon": 5}})));
        assert!(!matches(polygon, json!({"p": {"lat": 15, "lon": 5}})));

        let multi = json!({"geoMultiPolygon": {"field": "p", "polygons": [
            [[0, 0], [1, 0]],
            [[20, 20], [30, 20], [30, 30], [20, 30]]
        ]}});
        assert!(matches(multi.clone(), json!({"p": [25, 25]})));
        assert!(!matches(multi, json!({"p": [0.5, 0.1]})));

        let empty = json!({"geoMultiPolygon": {"field": "p", "polygons": []}});
        assert!(!matches(empty, json!({"p": [25, 25]})));
    }

    #[test]
    fn test_geo_line() {
        let line = json!({"geoLine": {"field": "p", "line": [[0, 0], [10, 0]], "distance": 120}});
        assert!(matches(line.clone(), json!({"p": {"lat": 1.0, "lon": 5.0}})));
        assert!(!matches(line, json!({"p": {"lat": 2.0, "lon": 5.0}})));

        let short = json!({"geoLine": {"field": "p", "line": [[0, 0]], "distance": 1000}});
        assert!(!matches(short, json!({"p": {"lat": 0.0, "lon": 0.0}})));
    }
}
