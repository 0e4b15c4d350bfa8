//! The `render` command draws the routes over the road network as a
//! standalone svg, without any network access.
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use serde::Serialize;
use serde_json::json;

use crate::dataset::{DataFiles, Dataset, RoadNetwork, RoutePoint};
use crate::geojson::{Bounds, Location};
use crate::itinerary::{format_clock, Itinerary, ItineraryColor, ItineraryElement};

/// Blank border around the drawing, in pixels
const MARGIN: f64 = 20.0;
/// Smallest extent (in degrees) of the drawn area
const MIN_SPAN: f64 = 0.01;
const DEPOT_COLOR: &str = "blue";
/// Roads at least this fast (km/h) are drawn thicker
const MAIN_ROAD_SPEED: f64 = 70.0;

/// This command lets you generate an svg map of the routes over the road network.
#[derive(Debug, Args)]
pub struct Render {
    #[clap(flatten)]
    pub data: DataFiles,
    /// Width of the image in pixels, the height follows the map proportions
    #[clap(short, long, default_value = "1600")]
    pub width: f64,
    /// Number the collection points in pickup order
    #[clap(short, long)]
    pub pickup_order: bool,
    /// Show the distance and duration of each route in the legend
    #[clap(short, long)]
    pub info: bool,
    /// If present, the path where to write the output svg
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

/// Equirectangular projection of a lon/lat box onto the image.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    origin: Location,
    /// Shrinks the longitudes so that a km is as long east-west as north-south
    x_factor: f64,
    scale: f64,
    pub width: f64,
    pub height: f64,
}

impl Projection {
    pub fn new(bounds: Bounds, width: f64) -> Self {
        let mid_latitude = (bounds.min.latitude + bounds.max.latitude) / 2.0;
        let x_factor = mid_latitude.to_radians().cos();
        let span_x = ((bounds.max.longitude - bounds.min.longitude) * x_factor).max(MIN_SPAN);
        let span_y = (bounds.max.latitude - bounds.min.latitude).max(MIN_SPAN);
        let scale = (width - 2.0 * MARGIN) / span_x;
        Projection {
            origin: Location::new(bounds.max.latitude, bounds.min.longitude),
            x_factor,
            scale,
            width,
            height: (span_y * scale + 2.0 * MARGIN).ceil(),
        }
    }

    /// Pixel coordinates, y pointing down
    pub fn project(&self, loc: Location) -> (f64, f64) {
        let x = MARGIN + (loc.longitude - self.origin.longitude) * self.x_factor * self.scale;
        let y = MARGIN + (self.origin.latitude - loc.latitude) * self.scale;
        (x, y)
    }

    fn svg_path(&self, line: &[Location]) -> String {
        line.iter()
            .enumerate()
            .map(|(i, loc)| {
                let (x, y) = self.project(*loc);
                format!("{}{x:.1},{y:.1}", if i == 0 { 'M' } else { 'L' })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Serialize)]
struct SvgRoad {
    d: String,
    width: u8,
}

#[derive(Debug, Serialize)]
struct SvgPoint {
    x: String,
    y: String,
    color: String,
    label: Option<String>,
}

#[derive(Debug, Serialize)]
struct SvgRoute {
    index: usize,
    points: Vec<SvgPoint>,
    depots: Vec<SvgPoint>,
}

#[derive(Debug, Serialize)]
struct LegendEntry {
    y: f64,
    color: String,
    text: String,
}

impl Render {
    /// Executes this command
    pub fn execute(&self) -> anyhow::Result<()> {
        let dataset = Dataset::load(&self.data).context("cannot load the data files")?;
        let svg = self.render(&dataset)?;
        crate::write_output(self.output.as_deref(), &svg)
    }

    pub fn render(&self, dataset: &Dataset) -> anyhow::Result<String> {
        if self.width <= 2.0 * MARGIN {
            bail!("the image must be wider than {} pixels", 2.0 * MARGIN);
        }
        let routes = dataset.resolve_routes()?;
        let n_routes = routes.len();
        let itineraries = if self.info {
            let distances = dataset.distances()?;
            let durations = dataset.durations()?;
            routes
                .into_iter()
                .enumerate()
                .map(|(i, route)| Itinerary::from_matrices(i, route, distances, durations))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            routes.into_iter().enumerate().map(|(i, route)| Itinerary::straight(i, route)).collect()
        };

        let empty = RoadNetwork::default();
        let network = dataset.road_network.as_ref().unwrap_or(&empty);
        let stops = Bounds::of(itineraries.iter().flat_map(|it| it.route.iter().map(|p| p.location)));
        let bounds = match (network.bounds(), stops) {
            (Some(mut roads), Some(stops)) => {
                roads.merge(stops);
                roads
            }
            (Some(bounds), None) | (None, Some(bounds)) => bounds,
            (None, None) => bail!("there is nothing to draw"),
        };
        let projection = Projection::new(bounds, self.width);

        let roads = network
            .segments
            .iter()
            .flat_map(|s| {
                let width = if s.speed.map_or(false, |v| v >= MAIN_ROAD_SPEED) { 2 } else { 1 };
                s.lines
                    .iter()
                    .filter(|l| l.len() > 1)
                    .map(move |l| SvgRoad { d: projection.svg_path(l), width })
            })
            .collect::<Vec<_>>();

        let routes = itineraries
            .iter()
            .map(|it| self.svg_route(&projection, it, n_routes))
            .collect::<Vec<_>>();
        let legend = itineraries
            .iter()
            .enumerate()
            .map(|(row, it)| LegendEntry {
                y: 30.0 + 24.0 * row as f64,
                color: ItineraryColor::new(n_routes, it.index).get(ItineraryElement::Point),
                text: self.legend_text(it),
            })
            .collect::<Vec<_>>();

        let handlebars = handlebars::Handlebars::new();
        Ok(handlebars.render_template(
            include_str!("./render_template.hbs"),
            &json!({
                "width": projection.width,
                "height": projection.height,
                "roads": roads,
                "routes": routes,
                "legend": legend,
            }),
        )?)
    }

    fn svg_route(&self, projection: &Projection, it: &Itinerary, n_routes: usize) -> SvgRoute {
        let color = ItineraryColor::new(n_routes, it.index).get(ItineraryElement::Point);
        let point = |loc: Location, color: &str, label: Option<String>| {
            let (x, y) = projection.project(loc);
            SvgPoint { x: format!("{x:.1}"), y: format!("{y:.1}"), color: color.to_string(), label }
        };
        let n = it.route.len();
        let collected: &[RoutePoint] = if n > 2 { &it.route[1..n - 1] } else { &[] };
        let points = collected
            .iter()
            .enumerate()
            .map(|(order, p)| point(p.location, &color, self.pickup_order.then(|| order.to_string())))
            .collect();
        let depots = it
            .route
            .first()
            .into_iter()
            .chain(it.route.last().filter(|_| n > 1))
            .map(|p| point(p.location, DEPOT_COLOR, None))
            .collect();

        SvgRoute { index: it.index, points, depots }
    }

    fn legend_text(&self, it: &Itinerary) -> String {
        let mut text = format!("route {}", it.index);
        if self.info {
            let km = (it.distance / 1000.0).ceil();
            text.push_str(&format!(", distance {km} km, duration {}", format_clock(it.duration())));
        }
        text
    }
}
