//! Geospatial helpers for geo conditions.
//!
//! Distances are great-circle distances on a spherical Earth computed with
//! the Haversine formula. Polygons are tested with ray casting in the
//! latitude/longitude plane, treating latitude as the vertical axis.

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Document, resolve_raw, value_to_f64};

/// Radius of the Earth in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Radius of the Earth in miles.
pub const EARTH_RADIUS_MI: f64 = 3958.8;

/// A geographical point with latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    /// Haversine distance to another point in kilometers.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_km(self, other)
    }

    /// Parse a point from a JSON value.
    ///
    /// Accepts `{"lat": .., "lon": ..}` with numbers or numeric strings,
    /// a GeoJSON-ordered `[lon, lat]` array, or a `"lat,lon"` string.
    pub fn from_value(value: &Value) -> Option<GeoPoint> {
        match value {
            Value::Object(map) => {
                let lat = value_to_f64(map.get("lat")?)?;
                let lon = value_to_f64(map.get("lon")?)?;
                Some(GeoPoint::new(lat, lon))
            }
            Value::Array(items) if items.len() >= 2 => {
                let lon = value_to_f64(&items[0])?;
                let lat = value_to_f64(&items[1])?;
                Some(GeoPoint::new(lat, lon))
            }
            Value::String(s) => parse_lat_lon(s),
            _ => None,
        }
    }
}

/// Parse a `"lat,lon"` string.
pub fn parse_lat_lon(value: &str) -> Option<GeoPoint> {
    let mut parts = value.split(',');
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lon = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(GeoPoint::new(lat, lon))
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PointVisitor;

        impl<'de> Visitor<'de> for PointVisitor {
            type Value = GeoPoint;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a {lat, lon} object, a [lon, lat] array, or a \"lat,lon\" string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<GeoPoint, E> {
                parse_lat_lon(v).ok_or_else(|| E::custom(format!("invalid point: {v}")))
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<GeoPoint, A::Error> {
                let lon: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let lat: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                while seq.next_element::<de::IgnoredAny>()?.is_some() {}
                Ok(GeoPoint::new(lat, lon))
            }

            fn visit_map<A: de::MapAccess<'de>>(
                self,
                map: A,
            ) -> std::result::Result<GeoPoint, A::Error> {
                let value = Value::deserialize(de::value::MapAccessDeserializer::new(map))?;
                GeoPoint::from_value(&value)
                    .ok_or_else(|| de::Error::custom("point object needs numeric lat and lon"))
            }
        }

        deserializer.deserialize_any(PointVisitor)
    }
}

/// Unit a distance threshold is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    /// Kilometers
    #[default]
    Kilometers,
    /// Miles
    Miles,
}

impl DistanceUnit {
    /// Parse a unit name; `mi` and `miles` select miles, anything else kilometers.
    pub fn parse(unit: &str) -> Self {
        match unit.to_ascii_lowercase().as_str() {
            "mi" | "miles" => DistanceUnit::Miles,
            _ => DistanceUnit::Kilometers,
        }
    }

    /// Convert a distance in kilometers to this unit.
    pub fn from_km(&self, km: f64) -> f64 {
        match self {
            DistanceUnit::Kilometers => km,
            DistanceUnit::Miles => km / (EARTH_RADIUS_KM / EARTH_RADIUS_MI),
        }
    }
}

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Ray-casting point-in-polygon test. Polygons with fewer than three
/// vertices contain nothing.
pub fn point_in_polygon(point: &GeoPoint, polygon: &[GeoPoint]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let p1 = &polygon[i];
        let p2 = &polygon[j];
        if (p1.lat > point.lat) != (p2.lat > point.lat) {
            let intersect_lon = (p2.lon - p1.lon) * (point.lat - p1.lat) / (p2.lat - p1.lat) + p1.lon;
            if point.lon < intersect_lon {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Shortest distance in kilometers from a point to a segment.
///
/// The closest point is found in a local equirectangular projection around
/// the segment, clamped to the segment ends, and measured with Haversine.
pub fn distance_to_segment_km(point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> f64 {
    let mean_lat = ((start.lat + end.lat) / 2.0).to_radians();
    let project = |p: &GeoPoint| (p.lon * mean_lat.cos(), p.lat);

    let (px, py) = project(point);
    let (sx, sy) = project(start);
    let (ex, ey) = project(end);

    let dx = ex - sx;
    let dy = ey - sy;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return haversine_km(point, start);
    }

    let t = (((px - sx) * dx + (py - sy) * dy) / length_sq).clamp(0.0, 1.0);
    let closest = GeoPoint::new(
        start.lat + t * (end.lat - start.lat),
        start.lon + t * (end.lon - start.lon),
    );
    haversine_km(point, &closest)
}

/// Minimum distance in kilometers from a point to a polyline.
pub fn distance_to_polyline_km(point: &GeoPoint, line: &[GeoPoint]) -> Option<f64> {
    line.windows(2)
        .map(|seg| distance_to_segment_km(point, &seg[0], &seg[1]))
        .min_by(|a, b| a.total_cmp(b))
}

/// Resolve the point stored at a document path.
pub fn resolve_point(doc: &Document, field: &str) -> Option<GeoPoint> {
    resolve_raw(doc, field).and_then(GeoPoint::from_value)
}
