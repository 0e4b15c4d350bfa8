//! This module implements the `visualize` command: it generates an html file
//! showing the collection routes on a leaflet map, optionally animated.
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use futures::future::try_join_all;
use handlebars::no_escape;
use serde::Serialize;
use serde_json::json;

use crate::dataset::{DataFiles, Dataset, RoutePoint};
use crate::error::DataError;
use crate::geojson::Location;
use crate::itinerary::{format_duration, Itinerary, ItineraryColor, ItineraryElement};
use crate::osrm::{OsrmClient, DEFAULT_OSRM_SERVER};

/// HOT tiles are prettier, the standard ones (`https://tile.openstreetmap.org/{z}/{x}/{y}.png`)
/// are more reliable.
pub const DEFAULT_TILES: &str = "http://a.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png";

/// This command lets you generate an html file showing the routes on a map.
#[derive(Debug, Args)]
pub struct Visualize {
    #[clap(flatten)]
    pub data: DataFiles,
    /// Indices of the routes to show, comma separated (all routes when absent)
    #[clap(short, long, value_delimiter = ',')]
    pub show: Vec<usize>,
    /// Follow the roads: ask the routing server for the itinerary of each route
    #[clap(long)]
    pub osrm: bool,
    /// URL of the osrm server to use
    #[clap(short, long, env = "ROUTEMAP_OSRM_URL", default_value = DEFAULT_OSRM_SERVER)]
    pub url_osrm: String,
    /// Url template of the map tiles
    #[clap(short, long, env = "ROUTEMAP_TILES", default_value = DEFAULT_TILES)]
    pub tiles: String,
    /// Add a player animating the vehicles along their routes
    #[clap(short, long)]
    pub animate: bool,
    /// How long (in seconds) the longest route takes to complete its animation
    #[clap(long, default_value = "20")]
    pub animation_seconds: f64,
    /// Restart the animation once every route is done
    #[clap(long = "loop")]
    pub looping: bool,
    /// If present, the path where to write the output html
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StopMarker {
    position: [f64; 2],
    popup: String,
    color: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteLayer {
    index: usize,
    track_color: String,
    used_track_color: String,
    line: Vec<[f64; 2]>,
    times: Vec<f64>,
    distance_km: String,
    duration: String,
    stops: Vec<StopMarker>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MapView {
    tiles: String,
    routes: Vec<RouteLayer>,
    animate: bool,
    #[serde(rename = "loop")]
    looping: bool,
    animation_seconds: f64,
    /// seconds needed by the slowest route
    longest: f64,
}

/// The indices of the routes to display. An empty selection means all.
pub fn select_routes(n_routes: usize, show: &[usize]) -> anyhow::Result<Vec<usize>> {
    if show.is_empty() {
        return Ok((0..n_routes).collect());
    }
    if let Some(unknown) = show.iter().find(|i| **i >= n_routes) {
        bail!("there is no route {unknown}, the routes file has {n_routes} routes");
    }
    let mut selected = show.to_vec();
    selected.sort_unstable();
    selected.dedup();
    Ok(selected)
}

impl Visualize {
    /// Executes this command
    pub async fn execute(&self) -> anyhow::Result<()> {
        if self.animation_seconds <= 0.0 {
            bail!("the animation must last a positive number of seconds");
        }
        let dataset = Dataset::load(&self.data).context("cannot load the data files")?;
        let routes = dataset.resolve_routes()?;
        let n_routes = routes.len();
        let selected = select_routes(n_routes, &self.show)?;
        let routes = routes
            .into_iter()
            .enumerate()
            .filter(|(i, _)| selected.binary_search(i).is_ok())
            .collect::<Vec<_>>();

        let itineraries = if self.osrm {
            self.road_itineraries(routes).await?
        } else {
            straight_itineraries(&dataset, routes)?
        };

        let html = self.visualize(&itineraries, n_routes)?;
        crate::write_output(self.output.as_deref(), &html)
    }

    /// Computes the actual itinerary of every route, all routes at once.
    async fn road_itineraries(&self, routes: Vec<(usize, Vec<RoutePoint>)>) -> anyhow::Result<Vec<Itinerary>> {
        let client = OsrmClient::new(self.url_osrm.clone())?;
        let client = &client;
        log::info!("asking {} for {} itineraries", self.url_osrm, routes.len());

        try_join_all(routes.into_iter().map(|(index, route)| async move {
            if route.len() < 2 {
                return Ok(Itinerary::straight(index, route));
            }
            let path = route.iter().map(|p| p.location).collect::<Vec<Location>>();
            let osrm = client
                .route(&path)
                .await
                .with_context(|| format!("cannot compute the itinerary of route {index}"))?;
            let it = Itinerary::from_osrm(index, route, &osrm)?;
            log::info!("route {index}: {:.2} km, {}", it.distance / 1000.0, format_duration(it.travel));
            Ok::<_, anyhow::Error>(it)
        }))
        .await
    }

    /// Renders the html page for the given itineraries. `n_routes` is the
    /// number of routes in the file, so that a route keeps its color
    /// whatever the selection.
    pub fn visualize(&self, itineraries: &[Itinerary], n_routes: usize) -> anyhow::Result<String> {
        let template = include_str!("./visual_template.hbs");

        let routes = itineraries.iter().map(|it| route_layer(it, n_routes)).collect::<Vec<_>>();
        let longest = routes
            .iter()
            .filter_map(|r| r.times.last().copied())
            .fold(0.0, f64::max);
        let view = MapView {
            tiles: self.tiles.clone(),
            routes,
            animate: self.animate,
            looping: self.looping,
            animation_seconds: self.animation_seconds,
            longest,
        };
        let view = serde_json::to_string(&view)?;

        let mut handlebars = handlebars::Handlebars::new();
        handlebars.register_escape_fn(no_escape);
        Ok(handlebars.render_template(template, &json!({ "view": view }))?)
    }
}

/// Straight lines between the stops, costed with the matrices when both are
/// available.
fn straight_itineraries(
    dataset: &Dataset,
    routes: Vec<(usize, Vec<RoutePoint>)>,
) -> Result<Vec<Itinerary>, DataError> {
    match (dataset.distances(), dataset.durations()) {
        (Ok(distances), Ok(durations)) => routes
            .into_iter()
            .map(|(index, route)| Itinerary::from_matrices(index, route, distances, durations))
            .collect(),
        _ => {
            log::warn!("distance or duration matrix unavailable, routes are shown without their cost");
            Ok(routes.into_iter().map(|(index, route)| Itinerary::straight(index, route)).collect())
        }
    }
}

fn route_layer(it: &Itinerary, n_routes: usize) -> RouteLayer {
    let color = ItineraryColor::new(n_routes, it.index);
    let last = it.route.len().saturating_sub(1);
    let stops = it
        .route
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (popup, depot) = if i == 0 {
                (format!("Start of route {}", it.index), true)
            } else if i == last {
                (format!("End of route {}", it.index), true)
            } else {
                (format!("Point {} of route {}", i - 1, it.index), false)
            };
            StopMarker {
                position: p.location.lat_lon(),
                popup,
                color: if depot { "#000000".to_string() } else { color.get(ItineraryElement::Point) },
            }
        })
        .collect();

    RouteLayer {
        index: it.index,
        track_color: color.get(ItineraryElement::Track),
        used_track_color: color.get(ItineraryElement::UsedTrack),
        line: it.geometry.iter().map(Location::lat_lon).collect(),
        times: it.timestamps(),
        distance_km: format!("{:.2}", it.distance / 1000.0),
        duration: format_duration(it.duration()),
        stops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::sample;

    fn command() -> Visualize {
        Visualize {
            data: DataFiles::in_dir("data"),
            show: vec![],
            osrm: false,
            url_osrm: DEFAULT_OSRM_SERVER.to_string(),
            tiles: DEFAULT_TILES.to_string(),
            animate: true,
            animation_seconds: 15.0,
            looping: false,
            output: None,
        }
    }

    /// Extracts the json object injected in the page
    fn view_of(html: &str) -> serde_json::Value {
        let start = html.find("const view = ").unwrap() + "const view = ".len();
        let end = start + html[start..].find(";\n").unwrap();
        serde_json::from_str(&html[start..end]).unwrap()
    }

    #[test]
    fn empty_selection_shows_everything() {
        assert_eq!(select_routes(3, &[]).unwrap(), vec![0, 1, 2]);
        assert_eq!(select_routes(3, &[2, 1, 2]).unwrap(), vec![1, 2]);
        assert!(select_routes(3, &[3]).is_err());
    }

    #[test]
    fn page_carries_every_selected_route() {
        let dataset = sample();
        let routes = dataset.resolve_routes().unwrap().into_iter().enumerate().collect::<Vec<_>>();
        let itineraries = straight_itineraries(&dataset, routes).unwrap();
        let html = command().visualize(&itineraries, 2).unwrap();

        assert!(html.contains("leaflet.js"));
        assert!(html.contains("requestFullscreen"));
        let view = view_of(&html);
        assert_eq!(view["tiles"], DEFAULT_TILES);
        assert_eq!(view["animate"], true);
        assert_eq!(view["loop"], false);
        assert_eq!(view["animationSeconds"], 15.0);
        assert!((view["longest"].as_f64().unwrap() - 680.0).abs() < 1e-6);

        let routes = view["routes"].as_array().unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0]["distanceKm"], "5.00");
        assert_eq!(routes[0]["duration"], "0 hours 11 minutes 20 seconds");
        assert_eq!(routes[0]["line"][1], json!([44.50, 6.30]));
        assert_eq!(routes[1]["times"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn depots_are_black_and_points_numbered() {
        let dataset = sample();
        let route = dataset.resolve_routes().unwrap().remove(0);
        let layer = route_layer(&Itinerary::straight(0, route), 2);
        let popups = layer.stops.iter().map(|s| s.popup.as_str()).collect::<Vec<_>>();
        assert_eq!(popups, vec!["Start of route 0", "Point 0 of route 0", "Point 1 of route 0", "End of route 0"]);
        assert_eq!(layer.stops[0].color, "#000000");
        assert_eq!(layer.stops[3].color, "#000000");
        assert_eq!(layer.stops[1].color, ItineraryColor::new(2, 0).get(ItineraryElement::Point));
    }

    #[test]
    fn missing_matrices_still_draw_the_routes() {
        let mut dataset = sample();
        dataset.durations = None;
        let routes = dataset.resolve_routes().unwrap().into_iter().enumerate().collect::<Vec<_>>();
        let itineraries = straight_itineraries(&dataset, routes).unwrap();
        assert_eq!(itineraries.len(), 2);
        assert!(itineraries.iter().all(|it| it.distance == 0.0));
        assert_eq!(itineraries[0].geometry.len(), 4);
    }

    #[test]
    fn huge_matrix_durations_are_an_error() {
        let mut dataset = sample();
        dataset.durations = Some(crate::dataset::Matrix::from_rows(vec![vec![1e20; 4]; 4]).unwrap());
        let routes = dataset.resolve_routes().unwrap().into_iter().enumerate().collect::<Vec<_>>();
        assert!(matches!(
            straight_itineraries(&dataset, routes),
            Err(DataError::DurationOutOfRange { route: 0, .. })
        ));
    }
}
