//! The routes file: an array of routes, each an array of stops.
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// A stop is either the index of a known point or an ad-hoc
/// `[latitude, longitude]` waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stop {
    Point(usize),
    Coordinate([f64; 2]),
}

impl Stop {
    pub fn point_index(&self) -> Option<usize> {
        match self {
            Stop::Point(i) => Some(*i),
            Stop::Coordinate(_) => None,
        }
    }
}

pub type Route = Vec<Stop>;

pub fn read_routes<R: Read>(reader: R) -> Result<Vec<Route>, DataError> {
    serde_json::from_reader(reader).map_err(|e| DataError::InvalidRoutes(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_and_waypoints() {
        let routes = read_routes("[[6, 0, 2, 6], [[44.5, 6.4], 1, 6]]".as_bytes()).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0], vec![Stop::Point(6), Stop::Point(0), Stop::Point(2), Stop::Point(6)]);
        assert_eq!(routes[1][0], Stop::Coordinate([44.5, 6.4]));
        assert_eq!(routes[1][0].point_index(), None);
        assert_eq!(routes[1][1].point_index(), Some(1));
    }

    #[test]
    fn malformed_stops_are_invalid_routes() {
        for bad in [
            r#"[[0, "a"]]"#,
            "[[0, [1.0, 2.0, 3.0]]]",
            "[[-1]]",
            r#"[{"stops": [0]}]"#,
            "[0, 1]",
        ] {
            assert!(
                matches!(read_routes(bad.as_bytes()), Err(DataError::InvalidRoutes(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn empty_routes_parse() {
        let routes = read_routes("[[], [3]]".as_bytes()).unwrap();
        assert!(routes[0].is_empty());
        assert_eq!(routes[1], vec![Stop::Point(3)]);
    }
}
