//! Just enough of the OSRM http api to know which roads a route follows.
//! See <http://project-osrm.org/docs/v5.10.0/api>.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::geojson::{GeoJsonGeometry, Location};

/// The demo server; good enough for a handful of routes.
pub const DEFAULT_OSRM_SERVER: &str = "http://router.project-osrm.org";

#[derive(Error, Debug)]
pub enum OsrmError {
    #[error("request to the routing server failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("routing server answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("routing server refused the route ({code}): {message}")]
    Service { code: String, message: String },

    #[error("routing server found no route")]
    NoRoute,

    #[error("a route needs at least two coordinates, got {0}")]
    TooFewCoordinates(usize),
}

/// One route as returned by OSRM (requested with geojson geometries)
#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRoute {
    pub geometry: GeoJsonGeometry,
    /// metres
    pub distance: f64,
    /// seconds
    pub duration: f64,
}

impl OsrmRoute {
    /// The vertices of the route, in driving order
    pub fn path(&self) -> Vec<Location> {
        self.geometry.lines().into_iter().flatten().collect()
    }
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

impl RouteResponse {
    fn into_route(self) -> Result<OsrmRoute, OsrmError> {
        if self.code != "Ok" {
            return Err(OsrmError::Service {
                code: self.code,
                message: self.message.unwrap_or_default(),
            });
        }
        self.routes.into_iter().next().ok_or(OsrmError::NoRoute)
    }
}

pub struct OsrmClient {
    client: Client,
    base_url: String,
}

impl OsrmClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, OsrmError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(OsrmClient { client, base_url })
    }

    /// Url of the driving route through all the given locations
    pub fn route_url(&self, path: &[Location]) -> String {
        let coordinates = path
            .iter()
            .map(|loc| format!("{},{}", loc.longitude, loc.latitude))
            .collect::<Vec<_>>()
            .join(";");
        format!("{}/route/v1/driving/{coordinates}?geometries=geojson&overview=full", self.base_url)
    }

    /// Asks the server for the driving route visiting the locations in order.
    pub async fn route(&self, path: &[Location]) -> Result<OsrmRoute, OsrmError> {
        if path.len() < 2 {
            return Err(OsrmError::TooFewCoordinates(path.len()));
        }
        let url = self.route_url(path);
        log::debug!("GET {url}");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // OSRM explains its 4xx answers in the same json envelope
        match serde_json::from_str::<RouteResponse>(&body) {
            Ok(parsed) => parsed.into_route(),
            Err(_) if !status.is_success() => Err(OsrmError::Status { status, body }),
            Err(e) => {
                log::error!("cannot parse the routing server answer: {e}. Body: {body}");
                Err(OsrmError::Service { code: "InvalidResponse".to_string(), message: e.to_string() })
            }
        }
    }
}
