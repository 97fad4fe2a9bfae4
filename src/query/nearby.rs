use geo::{EuclideanDistance, HaversineDistance};
use rayon::prelude::*;
use serde::Deserialize;

use crate::geofile::collection::AttractionCollection;

pub const NEARBY_RESULTS_NAME: &str = "Nearby Attractions";

/// Radius used when a proximity query does not give one.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Kilometres per degree used by the planar approximation.
pub const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryError {
    #[error("Latitude and longitude are required")]
    MissingCoordinates,
    #[error("Parameter {name} is not a valid number: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("Radius must not be negative, got {0}")]
    NegativeRadius(f64),
}

/// How distances between a query point and an attraction are measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance in degrees scaled by [`KM_PER_DEGREE`]. Cheap, and only reasonable for
    /// short distances away from the poles.
    #[default]
    Planar,
    /// Great-circle distance on a spherical earth.
    Haversine,
}

impl DistanceMetric {
    /// Distance in kilometres between two lon/lat points.
    pub fn distance_km(&self, from: &geo::Point, to: &geo::Point) -> f64 {
        match self {
            DistanceMetric::Planar => from.euclidean_distance(to) * KM_PER_DEGREE,
            DistanceMetric::Haversine => from.haversine_distance(to) / 1000.0,
        }
    }
}

/// Settings shared by all proximity queries.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct NearbySettings {
    pub default_radius_km: f64,
    pub distance_metric: DistanceMetric,
}

impl Default for NearbySettings {
    fn default() -> Self {
        Self {
            default_radius_km: DEFAULT_RADIUS_KM,
            distance_metric: DistanceMetric::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
    pub metric: DistanceMetric,
}

fn parse_number(name: &'static str, value: &str) -> Result<f64, QueryError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| QueryError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}

impl NearbyQuery {
    pub fn new(lat: f64, lng: f64, radius_km: f64) -> Self {
        Self {
            lat,
            lng,
            radius_km,
            metric: DistanceMetric::default(),
        }
    }

    pub fn with_metric(self, metric: DistanceMetric) -> Self {
        Self { metric, ..self }
    }

    /// Build a query from raw request parameters. `lat` and `lng` are required; a missing `radius`
    /// falls back to the default radius of `settings`.
    pub fn parse(
        lat: Option<&str>,
        lng: Option<&str>,
        radius: Option<&str>,
        settings: &NearbySettings,
    ) -> Result<Self, QueryError> {
        let (lat, lng) = match (lat, lng) {
            (Some(lat), Some(lng)) if !lat.is_empty() && !lng.is_empty() => (lat, lng),
            _ => return Err(QueryError::MissingCoordinates),
        };
        let lat = parse_number("lat", lat)?;
        let lng = parse_number("lng", lng)?;
        let radius_km = match radius.filter(|radius| !radius.is_empty()) {
            Some(radius) => parse_number("radius", radius)?,
            None => settings.default_radius_km,
        };
        if radius_km < 0.0 {
            return Err(QueryError::NegativeRadius(radius_km));
        }
        Ok(Self::new(lat, lng, radius_km).with_metric(settings.distance_metric))
    }
}

/// Attractions whose first position lies within the query radius. Features without a usable
/// position are left out. The result keeps the source metadata and order.
pub fn find_nearby(
    collection: &AttractionCollection,
    query: &NearbyQuery,
) -> AttractionCollection {
    let center = geo::Point::new(query.lng, query.lat);
    let features = collection
        .features
        .par_iter()
        .filter(|feature| match feature.first_position() {
            Some((lon, lat)) => {
                query.metric.distance_km(&center, &geo::Point::new(lon, lat)) <= query.radius_km
            }
            None => false,
        })
        .cloned()
        .collect();
    collection.with_features(NEARBY_RESULTS_NAME, features)
}
