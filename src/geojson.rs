//! The handful of GeoJSON shapes this tool reads: road networks and OSRM
//! responses.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A gps position. On the wire it is the GeoJSON position `[lon, lat]`;
/// an optional altitude is accepted and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Location { longitude, latitude }
    }

    /// Approximation of the distance in metres between two locations. Only
    /// meaningful for short distances at french latitudes.
    pub fn approx_distance_to(&self, other: &Location) -> f64 {
        let dlat = (self.latitude - other.latitude) * 111_194.9;
        let dlon = (self.longitude - other.longitude) * 75_905.5;
        dlat.hypot(dlon)
    }

    /// Leaflet wants `[lat, lon]`, the opposite of GeoJSON.
    pub fn lat_lon(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

impl TryFrom<Vec<f64>> for Location {
    type Error = String;

    fn try_from(position: Vec<f64>) -> Result<Self, Self::Error> {
        match position.as_slice() {
            [longitude, latitude, ..] => Ok(Location { longitude: *longitude, latitude: *latitude }),
            _ => Err(format!("a position needs at least two coordinates, got {}", position.len())),
        }
    }
}

impl From<Location> for [f64; 2] {
    fn from(loc: Location) -> Self {
        [loc.longitude, loc.latitude]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point { coordinates: Location },
    MultiPoint { coordinates: Vec<Location> },
    LineString { coordinates: Vec<Location> },
    MultiLineString { coordinates: Vec<Vec<Location>> },
    Polygon { coordinates: Vec<Vec<Location>> },
    /// Any geometry we have no use for (collections, multipolygons, ...)
    #[serde(other)]
    Unsupported,
}

impl GeoJsonGeometry {
    /// The polylines making up this geometry. Points yield nothing.
    pub fn lines(&self) -> Vec<Vec<Location>> {
        match self {
            GeoJsonGeometry::LineString { coordinates } => vec![coordinates.clone()],
            GeoJsonGeometry::MultiLineString { coordinates } => coordinates.clone(),
            GeoJsonGeometry::Polygon { coordinates } => coordinates.clone(),
            _ => vec![],
        }
    }
}

/// A GeoJSON feature as read from disk. The `"type"` member is not checked.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

/// Axis aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Location,
    pub max: Location,
}

impl Bounds {
    pub fn around(loc: Location) -> Self {
        Bounds { min: loc, max: loc }
    }

    pub fn extend(&mut self, loc: Location) {
        self.min.longitude = self.min.longitude.min(loc.longitude);
        self.min.latitude = self.min.latitude.min(loc.latitude);
        self.max.longitude = self.max.longitude.max(loc.longitude);
        self.max.latitude = self.max.latitude.max(loc.latitude);
    }

    pub fn merge(&mut self, other: Bounds) {
        self.extend(other.min);
        self.extend(other.max);
    }

    /// `None` when the iterator is empty.
    pub fn of<I: IntoIterator<Item = Location>>(locations: I) -> Option<Bounds> {
        let mut it = locations.into_iter();
        let mut bounds = Bounds::around(it.next()?);
        it.for_each(|loc| bounds.extend(loc));
        Some(bounds)
    }
}
