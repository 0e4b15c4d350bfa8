//! Loading and cross-checking the data files describing a collection study.
//!
//! Every per-point file (distance and duration matrices, service times)
//! follows the order of `points.csv`, whose last row is the depot. Routes
//! refer to points by their position in that file.
use std::{
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Args;
use thiserror::Error;

use crate::error::DataError;
use crate::geojson::Location;

mod matrix;
mod points;
mod road_network;
mod routes;
mod service_times;

pub use matrix::Matrix;
pub use points::{read_points, Points};
pub use road_network::RoadNetwork;
pub use routes::{read_routes, Route, Stop};
pub use service_times::read_service_times;

pub const POINTS_FILE: &str = "points.csv";
pub const SERVICE_TIMES_FILE: &str = "exemple_points_service_time.csv";
pub const ROUTES_FILE: &str = "exemple_routes.json";
pub const DISTANCES_FILE: &str = "distances.json";
pub const DURATIONS_FILE: &str = "durations.json";
pub const ROAD_NETWORK_FILE: &str = "road_network.json";

/// Where to find the data files. Every file defaults to its usual name in
/// the data directory.
#[derive(Debug, Clone, Args)]
pub struct DataFiles {
    /// Directory holding the data files
    #[clap(short = 'd', long, env = "ROUTEMAP_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
    /// Collection points table [default: <data-dir>/points.csv]
    #[clap(long)]
    pub points: Option<PathBuf>,
    /// Delimiter of the points table
    #[clap(long, default_value = ";")]
    pub delimiter: char,
    /// Service time of each point [default: <data-dir>/exemple_points_service_time.csv]
    #[clap(long)]
    pub service_times: Option<PathBuf>,
    /// Routes to display [default: <data-dir>/exemple_routes.json]
    #[clap(short = 'r', long)]
    pub routes: Option<PathBuf>,
    /// Distance matrix in metres [default: <data-dir>/distances.json]
    #[clap(long)]
    pub distances: Option<PathBuf>,
    /// Duration matrix in seconds [default: <data-dir>/durations.json]
    #[clap(long)]
    pub durations: Option<PathBuf>,
    /// Road network GeoJSON [default: <data-dir>/road_network.json]
    #[clap(long)]
    pub road_network: Option<PathBuf>,
}

impl DataFiles {
    /// Every file at its default place in `dir`.
    #[cfg(test)]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        DataFiles {
            data_dir: dir.into(),
            points: None,
            delimiter: ';',
            service_times: None,
            routes: None,
            distances: None,
            durations: None,
            road_network: None,
        }
    }

    fn path(&self, explicit: &Option<PathBuf>, default: &str) -> PathBuf {
        explicit.clone().unwrap_or_else(|| self.data_dir.join(default))
    }

    pub fn points_path(&self) -> PathBuf {
        self.path(&self.points, POINTS_FILE)
    }
    pub fn service_times_path(&self) -> PathBuf {
        self.path(&self.service_times, SERVICE_TIMES_FILE)
    }
    pub fn routes_path(&self) -> PathBuf {
        self.path(&self.routes, ROUTES_FILE)
    }
    pub fn distances_path(&self) -> PathBuf {
        self.path(&self.distances, DISTANCES_FILE)
    }
    pub fn durations_path(&self) -> PathBuf {
        self.path(&self.durations, DURATIONS_FILE)
    }
    pub fn road_network_path(&self) -> PathBuf {
        self.path(&self.road_network, ROAD_NETWORK_FILE)
    }
}

fn open(path: &Path) -> Result<BufReader<File>, DataError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| DataError::Io { path: path.to_path_buf(), source })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A referential integrity problem between the data files.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IssueKind {
    #[error("the {what} file {} is missing", path.display())]
    MissingFile { what: &'static str, path: PathBuf },
    #[error("the {what} file {} cannot be read: {reason}", path.display())]
    Unreadable { what: &'static str, path: PathBuf, reason: String },
    #[error("the {what} matrix is {size}x{size} but there are {expected} points")]
    MatrixSize { what: &'static str, size: usize, expected: usize },
    #[error("the {what} matrix has {count} negative entries")]
    NegativeEntries { what: &'static str, count: usize },
    #[error("there are {found} service times but {expected} points")]
    ServiceTimeCount { found: usize, expected: usize },
    #[error("stop {position} of route {route} is point {index} but there are only {count} points")]
    PointOutOfRange { route: usize, position: usize, index: usize, count: usize },
    #[error("route {route} has no stop")]
    EmptyRoute { route: usize },
    #[error("route {route} does not start and end at the depot (point {depot})")]
    NotAnchored { route: usize, depot: usize },
    #[error("row {row} of the points file declares index {declared}")]
    IndexMismatch { row: usize, declared: usize },
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::MissingFile { .. }
            | IssueKind::Unreadable { .. }
            | IssueKind::MatrixSize { .. }
            | IssueKind::ServiceTimeCount { .. }
            | IssueKind::PointOutOfRange { .. } => Severity::Error,
            IssueKind::NegativeEntries { .. }
            | IssueKind::EmptyRoute { .. }
            | IssueKind::NotAnchored { .. }
            | IssueKind::IndexMismatch { .. } => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
}

impl From<IssueKind> for Issue {
    fn from(kind: IssueKind) -> Self {
        Issue { severity: kind.severity(), kind }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.kind)
    }
}

/// The outcome of [`Dataset::validate`].
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub issues: Vec<Issue>,
}

impl Report {
    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }
    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }
}

/// A stop of a route once resolved against the points table.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePoint {
    /// `None` for ad-hoc waypoints
    pub index: Option<usize>,
    pub location: Location,
    pub service_time: Duration,
}

/// All the data files of a study. Points and routes are mandatory; the
/// other files are kept when they could be read and reported otherwise.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub points: Points,
    pub routes: Vec<Route>,
    pub service_times: Option<Vec<Duration>>,
    pub distances: Option<Matrix>,
    pub durations: Option<Matrix>,
    pub road_network: Option<RoadNetwork>,
    /// Problems met while loading the optional files
    load_issues: Vec<Issue>,
}

impl Dataset {
    pub fn new(points: Points, routes: Vec<Route>) -> Self {
        Dataset {
            points,
            routes,
            service_times: None,
            distances: None,
            durations: None,
            road_network: None,
            load_issues: vec![],
        }
    }

    pub fn load(files: &DataFiles) -> Result<Self, DataError> {
        let delimiter = u8::try_from(files.delimiter).map_err(|_| DataError::Delimiter(files.delimiter))?;

        let points_path = files.points_path();
        let points = read_points(open(&points_path)?, delimiter)?;
        let depot = points.depot();
        log::info!(
            "{} points read from {} (depot at {}, {})",
            points.len(),
            points_path.display(),
            depot.location.latitude,
            depot.location.longitude
        );

        let routes_path = files.routes_path();
        let routes = read_routes(open(&routes_path)?)?;
        log::info!("{} routes read from {}", routes.len(), routes_path.display());

        let mut dataset = Dataset::new(points, routes);
        dataset.service_times = dataset.optional("service times", &files.service_times_path(), true, |r| read_service_times(r));
        dataset.distances = dataset.optional("distance", &files.distances_path(), true, |r| Matrix::read(r));
        dataset.durations = dataset.optional("duration", &files.durations_path(), true, |r| Matrix::read(r));
        // only an explicitly requested network is missed
        let required = files.road_network.is_some();
        dataset.road_network = dataset.optional("road network", &files.road_network_path(), required, |r| RoadNetwork::read(r));
        if let Some(network) = &dataset.road_network {
            log::info!("{} road segments, {:.1} km of roads", network.segments.len(), network.total_length() / 1000.0);
        }
        Ok(dataset)
    }

    fn optional<T>(
        &mut self,
        what: &'static str,
        path: &Path,
        required: bool,
        read: impl FnOnce(BufReader<File>) -> Result<T, DataError>,
    ) -> Option<T> {
        if !path.exists() {
            if required {
                log::warn!("no {what} file at {}", path.display());
                self.load_issues.push(IssueKind::MissingFile { what, path: path.to_path_buf() }.into());
            }
            return None;
        }
        match open(path).and_then(read) {
            Ok(value) => {
                log::debug!("{what} read from {}", path.display());
                Some(value)
            }
            Err(e) => {
                log::warn!("cannot read {what} file {}: {e}", path.display());
                self.load_issues.push(
                    IssueKind::Unreadable { what, path: path.to_path_buf(), reason: e.to_string() }.into(),
                );
                None
            }
        }
    }

    pub fn distances(&self) -> Result<&Matrix, DataError> {
        self.distances.as_ref().ok_or(DataError::Unavailable("distance matrix"))
    }

    pub fn durations(&self) -> Result<&Matrix, DataError> {
        self.durations.as_ref().ok_or(DataError::Unavailable("duration matrix"))
    }

    pub fn service_times(&self) -> Result<&[Duration], DataError> {
        self.service_times.as_deref().ok_or(DataError::Unavailable("service times"))
    }

    /// Checks every cross-file constraint and gathers all the problems found.
    pub fn validate(&self) -> Report {
        let mut issues = self.load_issues.clone();
        let count = self.points.len();
        let depot = self.points.depot_index();

        for (row, point) in self.points.iter().enumerate() {
            if let Some(declared) = point.declared_index {
                if declared != row {
                    issues.push(IssueKind::IndexMismatch { row, declared }.into());
                }
            }
        }

        for (what, matrix) in [("distance", &self.distances), ("duration", &self.durations)] {
            if let Some(matrix) = matrix {
                if matrix.size() != count {
                    issues.push(IssueKind::MatrixSize { what, size: matrix.size(), expected: count }.into());
                }
                let negative = matrix.negative_entries();
                if negative > 0 {
                    issues.push(IssueKind::NegativeEntries { what, count: negative }.into());
                }
            }
        }

        if let Some(times) = &self.service_times {
            if times.len() != count {
                issues.push(IssueKind::ServiceTimeCount { found: times.len(), expected: count }.into());
            }
        }

        for (route, stops) in self.routes.iter().enumerate() {
            if stops.is_empty() {
                issues.push(IssueKind::EmptyRoute { route }.into());
                continue;
            }
            for (position, stop) in stops.iter().enumerate() {
                if let Some(index) = stop.point_index() {
                    if index >= count {
                        issues.push(IssueKind::PointOutOfRange { route, position, index, count }.into());
                    }
                }
            }
            let off_depot = |stop: &Stop| matches!(stop.point_index(), Some(i) if i != depot);
            if stops.first().map_or(false, off_depot) || stops.last().map_or(false, off_depot) {
                issues.push(IssueKind::NotAnchored { route, depot }.into());
            }
        }

        Report { issues }
    }

    /// Turns the stops of every route into located points. Service times
    /// default to zero when the file is absent or too short.
    pub fn resolve_routes(&self) -> Result<Vec<Vec<RoutePoint>>, DataError> {
        let count = self.points.len();
        let service_time = |index: usize| {
            self.service_times
                .as_ref()
                .and_then(|t| t.get(index).copied())
                .unwrap_or_default()
        };

        self.routes
            .iter()
            .enumerate()
            .map(|(route, stops)| {
                stops
                    .iter()
                    .map(|stop| match *stop {
                        Stop::Point(index) => {
                            let point = self
                                .points
                                .get(index)
                                .ok_or(DataError::UnknownPoint { route, index, count })?;
                            Ok(RoutePoint {
                                index: Some(index),
                                location: point.location,
                                service_time: service_time(index),
                            })
                        }
                        Stop::Coordinate([latitude, longitude]) => Ok(RoutePoint {
                            index: None,
                            location: Location::new(latitude, longitude),
                            service_time: Duration::ZERO,
                        }),
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{fs, io::Write};

    use super::*;

    /// Three collection points and the depot (point 3).
    pub(crate) fn sample() -> Dataset {
        let points = read_points(
            "latitude;longitude\n44.50;6.30\n44.52;6.35\n44.55;6.40\n44.53;6.45\n".as_bytes(),
            b';',
        )
        .unwrap();
        let routes = read_routes("[[3, 0, 1, 3], [3, 2, 3]]".as_bytes()).unwrap();
        let mut dataset = Dataset::new(points, routes);
        dataset.service_times = Some(vec![
            Duration::from_secs(60),
            Duration::from_secs(120),
            Duration::from_secs(30),
            Duration::ZERO,
        ]);
        dataset.distances = Some(
            Matrix::from_rows(vec![
                vec![0.0, 1000.0, 2000.0, 1500.0],
                vec![1000.0, 0.0, 1200.0, 2500.0],
                vec![2000.0, 1200.0, 0.0, 800.0],
                vec![1500.0, 2500.0, 800.0, 0.0],
            ])
            .unwrap(),
        );
        dataset.durations = Some(
            Matrix::from_rows(vec![
                vec![0.0, 100.0, 200.0, 150.0],
                vec![100.0, 0.0, 120.0, 250.0],
                vec![200.0, 120.0, 0.0, 80.0],
                vec![150.0, 250.0, 80.0, 0.0],
            ])
            .unwrap(),
        );
        dataset
    }

    fn kinds(report: &Report) -> Vec<IssueKind> {
        report.issues.iter().map(|i| i.kind.clone()).collect()
    }

    #[test]
    fn consistent_dataset_is_valid() {
        let report = sample().validate();
        assert!(report.is_valid());
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn matrix_dimension_must_match_point_count() {
        let mut dataset = sample();
        dataset.durations = Some(Matrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap());
        let report = dataset.validate();
        assert!(!report.is_valid());
        assert_eq!(kinds(&report), vec![IssueKind::MatrixSize { what: "duration", size: 2, expected: 4 }]);
    }

    #[test]
    fn service_time_count_must_match_point_count() {
        let mut dataset = sample();
        dataset.service_times = Some(vec![Duration::ZERO; 5]);
        let report = dataset.validate();
        assert_eq!(kinds(&report), vec![IssueKind::ServiceTimeCount { found: 5, expected: 4 }]);
    }

    #[test]
    fn route_indices_must_be_valid_points() {
        let mut dataset = sample();
        dataset.routes = read_routes("[[3, 0, 7, 3]]".as_bytes()).unwrap();
        let report = dataset.validate();
        assert_eq!(
            kinds(&report),
            vec![IssueKind::PointOutOfRange { route: 0, position: 2, index: 7, count: 4 }]
        );
        assert!(matches!(
            dataset.resolve_routes(),
            Err(DataError::UnknownPoint { route: 0, index: 7, count: 4 })
        ));
    }

    #[test]
    fn warnings_do_not_invalidate() {
        let mut dataset = sample();
        dataset.routes = read_routes("[[], [0, 1, 3], [[44.5, 6.3], 2, 3]]".as_bytes()).unwrap();
        let report = dataset.validate();
        assert!(report.is_valid());
        assert_eq!(
            kinds(&report),
            vec![IssueKind::EmptyRoute { route: 0 }, IssueKind::NotAnchored { route: 1, depot: 3 }]
        );
        assert_eq!(report.warnings().count(), 2);
    }

    #[test]
    fn negative_costs_are_warned() {
        let mut dataset = sample();
        dataset.distances = Some(
            Matrix::from_rows(vec![
                vec![0.0, -1.0, 0.0, 0.0],
                vec![0.0; 4],
                vec![0.0; 4],
                vec![0.0; 4],
            ])
            .unwrap(),
        );
        let report = dataset.validate();
        assert!(report.is_valid());
        assert_eq!(kinds(&report), vec![IssueKind::NegativeEntries { what: "distance", count: 1 }]);
    }

    #[test]
    fn resolved_routes_carry_locations_and_service_times() {
        let dataset = sample();
        let routes = dataset.resolve_routes().unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].len(), 4);
        assert_eq!(routes[0][1].index, Some(0));
        assert_eq!(routes[0][1].location, Location::new(44.50, 6.30));
        assert_eq!(routes[0][2].service_time, Duration::from_secs(120));
        assert_eq!(routes[1][1].service_time, Duration::from_secs(30));
    }

    #[test]
    fn waypoints_have_no_service_time() {
        let mut dataset = sample();
        dataset.routes = read_routes("[[3, [44.6, 6.5], 3]]".as_bytes()).unwrap();
        let routes = dataset.resolve_routes().unwrap();
        assert_eq!(routes[0][1].index, None);
        assert_eq!(routes[0][1].location, Location::new(44.6, 6.5));
        assert_eq!(routes[0][1].service_time, Duration::ZERO);
    }

    #[test]
    fn declared_index_out_of_order_is_warned() {
        let points = read_points("index;latitude;longitude\n0;44.0;6.0\n5;44.1;6.1\n".as_bytes(), b';').unwrap();
        let dataset = Dataset::new(points, vec![]);
        let report = dataset.validate();
        assert_eq!(kinds(&report), vec![IssueKind::IndexMismatch { row: 1, declared: 5 }]);
    }

    #[test]
    fn load_reads_every_file_from_the_data_dir() {
        let dir = std::env::temp_dir().join(format!("routemap-load-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let write = |name: &str, content: &str| {
            fs::File::create(dir.join(name)).unwrap().write_all(content.as_bytes()).unwrap();
        };
        write(POINTS_FILE, "index;address;latitude;longitude\n0;a;44.0;6.0\n1;depot;44.1;6.1\n");
        write(SERVICE_TIMES_FILE, "service_time\n45\n0\n");
        write(ROUTES_FILE, "[[1, 0, 1]]");
        write(DISTANCES_FILE, "[[0, 10], [10, 0]]");
        write(DURATIONS_FILE, "[[0, 1], [1]]");

        let dataset = Dataset::load(&DataFiles::in_dir(&dir)).unwrap();
        assert_eq!(dataset.points.len(), 2);
        assert_eq!(dataset.routes.len(), 1);
        assert!(dataset.distances.is_some());
        assert!(dataset.durations.is_none());
        assert!(dataset.road_network.is_none());
        assert!(matches!(dataset.durations(), Err(DataError::Unavailable(_))));

        let report = dataset.validate();
        assert!(!report.is_valid());
        assert!(matches!(
            report.issues.as_slice(),
            [Issue { kind: IssueKind::Unreadable { what: "duration", .. }, .. }]
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_fails_without_points() {
        let files = DataFiles::in_dir("/nonexistent/routemap");
        assert!(matches!(Dataset::load(&files), Err(DataError::Io { .. })));
    }
}
