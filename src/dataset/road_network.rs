use std::io::Read;

use crate::error::DataError;
use crate::geojson::{Bounds, FeatureCollection, Location};

/// One road of the network, possibly made of several polylines.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadSegment {
    pub lines: Vec<Vec<Location>>,
    /// km/h
    pub speed: Option<f64>,
    /// metres
    pub length: Option<f64>,
}

/// The roads drawn underneath the routes on the offline map.
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    pub segments: Vec<RoadSegment>,
}

impl RoadNetwork {
    /// Reads a GeoJSON feature collection. Features without a line geometry
    /// are skipped.
    pub fn read<R: Read>(reader: R) -> Result<Self, DataError> {
        let collection: FeatureCollection = serde_json::from_reader(reader)?;
        let total = collection.features.len();

        let segments = collection
            .features
            .into_iter()
            .filter_map(|feature| {
                let lines = feature.geometry?.lines();
                if lines.is_empty() {
                    return None;
                }
                Some(RoadSegment {
                    lines,
                    speed: feature.properties.get("speed").and_then(|v| v.as_f64()),
                    length: feature.properties.get("length").and_then(|v| v.as_f64()),
                })
            })
            .collect::<Vec<_>>();

        if segments.len() < total {
            log::debug!("skipped {} road features without line geometry", total - segments.len());
        }
        Ok(RoadNetwork { segments })
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(
            self.segments
                .iter()
                .flat_map(|s| s.lines.iter())
                .flat_map(|l| l.iter().copied()),
        )
    }

    /// Total length of the roads which declare one, in metres.
    pub fn total_length(&self) -> f64 {
        self.segments.iter().filter_map(|s| s.length).sum()
    }
}
