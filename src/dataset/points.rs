//! The collection points table. The last row is always the depot.
use std::io::Read;

use serde::Deserialize;

use crate::error::DataError;
use crate::geojson::Location;

/// One row of `points.csv`
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// The index declared in the file, when there is an `index` column
    pub declared_index: Option<usize>,
    pub address: Option<String>,
    pub location: Location,
}

#[derive(Debug, Deserialize)]
struct PointRecord {
    index: Option<usize>,
    address: Option<String>,
    latitude: f64,
    longitude: f64,
}

/// The ordered list of points. Every other per-point file (matrices, service
/// times) follows this order.
#[derive(Debug, Clone)]
pub struct Points(Vec<Point>);

impl Points {
    pub fn new(points: Vec<Point>) -> Result<Self, DataError> {
        if points.is_empty() {
            Err(DataError::NoDepot)
        } else {
            Ok(Points(points))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.0.iter()
    }

    pub fn depot_index(&self) -> usize {
        self.0.len() - 1
    }

    pub fn depot(&self) -> &Point {
        &self.0[self.depot_index()]
    }
}

/// Reads the points table. Unknown columns are ignored.
pub fn read_points<R: Read>(reader: R, delimiter: u8) -> Result<Points, DataError> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut points = vec![];
    for record in csv.deserialize() {
        let PointRecord { index, address, latitude, longitude } = record?;
        points.push(Point {
            declared_index: index,
            address,
            location: Location::new(latitude, longitude),
        });
    }
    Points::new(points)
}
