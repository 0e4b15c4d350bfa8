use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while reading the data files.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("cannot open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("the points file is empty, there is no depot")]
    NoDepot,

    #[error("the csv delimiter must be a single ascii character, got {0:?}")]
    Delimiter(char),

    #[error("matrix row {row} has {found} columns but the matrix has {expected} rows")]
    NotSquare { row: usize, found: usize, expected: usize },

    #[error("service time on row {row} must be a non-negative number of seconds, got {value}")]
    InvalidServiceTime { row: usize, value: f64 },

    #[error("invalid routes: {0}")]
    InvalidRoutes(String),

    #[error("route {route} visits point {index} but there are only {count} points")]
    UnknownPoint { route: usize, index: usize, count: usize },

    #[error("route {route} lasts {seconds} seconds, which is out of range")]
    DurationOutOfRange { route: usize, seconds: f64 },

    #[error("the {0} could not be loaded (run `validate` for details)")]
    Unavailable(&'static str),
}
