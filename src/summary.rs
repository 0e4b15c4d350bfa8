//! This module implements the `summary` command: the distance and duration of
//! every route, computed from the matrices.
use std::{fmt::Write, time::Duration};

use anyhow::Context;
use clap::Args;

use crate::dataset::{DataFiles, Dataset};
use crate::itinerary::{format_duration, Itinerary};

/// This command prints the length and duration of each route.
#[derive(Debug, Args)]
pub struct Summary {
    #[clap(flatten)]
    pub data: DataFiles,
}

impl Summary {
    /// Executes this command
    pub fn execute(&self) -> anyhow::Result<()> {
        let dataset = Dataset::load(&self.data).context("cannot load the data files")?;
        print!("{}", summarize(&dataset)?);
        Ok(())
    }
}

/// One line per route followed by the totals.
pub fn summarize(dataset: &Dataset) -> anyhow::Result<String> {
    let distances = dataset.distances()?;
    let durations = dataset.durations()?;
    dataset.service_times()?;

    let mut out = String::new();
    let mut total_distance = 0.0;
    let mut total_duration = Duration::ZERO;
    for (index, route) in dataset.resolve_routes()?.into_iter().enumerate() {
        let stops = route.len();
        let it = Itinerary::from_matrices(index, route, distances, durations)?;
        total_distance += it.distance;
        total_duration = total_duration.saturating_add(it.duration());
        writeln!(
            out,
            "route {index:>3}: {stops:>3} stops, {:>8.2} km, {}",
            it.distance / 1000.0,
            format_duration(it.duration())
        )?;
    }
    writeln!(
        out,
        "total    : {:>3} routes, {:>8.2} km, {}",
        dataset.routes.len(),
        total_distance / 1000.0,
        format_duration(total_duration)
    )?;
    Ok(out)
}
