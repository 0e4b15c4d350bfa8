//! An itinerary is a route once we know the path it follows on the map and
//! how long it takes.
use std::time::Duration;

use crate::dataset::{Matrix, RoutePoint};
use crate::error::DataError;
use crate::geojson::Location;
use crate::osrm::OsrmRoute;

// Saturation and value of each kind of element (between 0 and 1)
const TRACK_SV: (f64, f64) = (0.4, 0.4);
const USED_TRACK_SV: (f64, f64) = (0.3, 0.9);
const POINT_SV: (f64, f64) = (0.8, 0.9);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItineraryElement {
    Track,
    UsedTrack,
    Point,
}

/// Every route gets its own hue; the kind of element drawn decides
/// saturation and value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItineraryColor {
    hue: f64,
}

impl ItineraryColor {
    pub fn new(n_routes: usize, index: usize) -> Self {
        let hue = if n_routes == 0 { 0.0 } else { index as f64 / n_routes as f64 };
        ItineraryColor { hue }
    }

    /// Hex color (`#rrggbb`) of the given element
    pub fn get(&self, element: ItineraryElement) -> String {
        let (s, v) = match element {
            ItineraryElement::Track => TRACK_SV,
            ItineraryElement::UsedTrack => USED_TRACK_SV,
            ItineraryElement::Point => POINT_SV,
        };
        hsv_to_hex(self.hue, s, v)
    }
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

fn hsv_to_hex(h: f64, s: f64, v: f64) -> String {
    let (r, g, b) = hsv_to_rgb(h, s, v);
    let byte = |c: f64| (255.0 * c) as u8;
    format!("#{:02x}{:02x}{:02x}", byte(r), byte(g), byte(b))
}

#[derive(Debug, Clone)]
pub struct Itinerary {
    /// Position of the route in the routes file
    pub index: usize,
    pub route: Vec<RoutePoint>,
    /// The polyline followed on the map
    pub geometry: Vec<Location>,
    /// metres
    pub distance: f64,
    /// Time spent driving
    pub travel: Duration,
}

impl Itinerary {
    /// A route drawn as straight lines between its stops, with no cost.
    pub fn straight(index: usize, route: Vec<RoutePoint>) -> Self {
        let geometry = route.iter().map(|p| p.location).collect();
        Itinerary { index, route, geometry, distance: 0.0, travel: Duration::ZERO }
    }

    /// A route drawn as straight lines between its stops, whose costs are
    /// read from the distance and duration matrices.
    pub fn from_matrices(
        index: usize,
        route: Vec<RoutePoint>,
        distances: &Matrix,
        durations: &Matrix,
    ) -> Result<Self, DataError> {
        let mut distance = 0.0;
        let mut seconds = 0.0;
        let mut unknown_legs = 0;
        for leg in route.windows(2) {
            match (leg[0].index, leg[1].index) {
                (Some(from), Some(to)) if from < distances.size() && to < distances.size()
                    && from < durations.size() && to < durations.size() => {
                    distance += distances.get(from, to);
                    seconds += durations.get(from, to);
                }
                _ => unknown_legs += 1,
            }
        }
        if unknown_legs > 0 {
            log::warn!("route {index}: {unknown_legs} legs have no matrix entry and count for nothing");
        }

        let mut itinerary = Itinerary::straight(index, route);
        itinerary.distance = distance;
        itinerary.travel = travel_time(index, seconds)?;
        Ok(itinerary)
    }

    /// A route following the roads as computed by the routing server.
    pub fn from_osrm(index: usize, route: Vec<RoutePoint>, osrm: &OsrmRoute) -> Result<Self, DataError> {
        Ok(Itinerary {
            index,
            travel: travel_time(index, osrm.duration)?,
            route,
            geometry: osrm.path(),
            distance: osrm.distance,
        })
    }

    /// Time spent serving the collection points. The first and last stops
    /// are the depot and cost nothing.
    pub fn service(&self) -> Duration {
        match self.route.len() {
            0..=2 => Duration::ZERO,
            n => self.route[1..n - 1]
                .iter()
                .fold(Duration::ZERO, |acc, p| acc.saturating_add(p.service_time)),
        }
    }

    /// Total time from leaving the first stop to reaching the last one
    pub fn duration(&self) -> Duration {
        self.travel.saturating_add(self.service())
    }

    /// The vertex of the geometry closest to the given location
    fn nearest_vertex(&self, loc: &Location) -> Option<usize> {
        self.geometry
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.approx_distance_to(loc).total_cmp(&b.approx_distance_to(loc)))
            .map(|(i, _)| i)
    }

    /// When (in seconds since the start) each vertex of the geometry is
    /// reached. The travel time is spread evenly over the vertices; each
    /// collection point holds the vehicle at its nearest vertex for its
    /// service time.
    pub fn timestamps(&self) -> Vec<f64> {
        let n = self.geometry.len();
        if n == 0 {
            return vec![];
        }
        let mut pause = vec![0.0; n];
        if self.route.len() > 2 {
            for p in &self.route[1..self.route.len() - 1] {
                if let Some(i) = self.nearest_vertex(&p.location) {
                    pause[i] += p.service_time.as_secs_f64();
                }
            }
        }
        let step = if n > 1 { self.travel.as_secs_f64() / (n - 1) as f64 } else { 0.0 };

        let mut times = Vec::with_capacity(n);
        let mut now = pause[0];
        times.push(now);
        for wait in pause.iter().skip(1) {
            now += step + wait;
            times.push(now);
        }
        times
    }
}

/// Negative travel times count as zero; times too long to be held in a
/// `Duration` are an error.
fn travel_time(route: usize, seconds: f64) -> Result<Duration, DataError> {
    Duration::try_from_secs_f64(seconds.max(0.0)).map_err(|_| DataError::DurationOutOfRange { route, seconds })
}

/// `"1 hours 2 minutes 3 seconds"`
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = total % 3600 / 60;
    let seconds = total % 60;
    format!("{hours} hours {minutes} minutes {seconds} seconds")
}

/// `"1:02:03"`
pub fn format_clock(d: Duration) -> String {
    let total = d.as_secs();
    format!("{}:{:02}:{:02}", total / 3600, total % 3600 / 60, total % 60)
}
