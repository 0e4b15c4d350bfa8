use std::{env, fs::File, io::Write, path::Path};

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};

use render::Render;
use summary::Summary;
use validate::Validate;
use visualisation::Visualize;

mod dataset;
mod error;
mod geojson;
mod itinerary;
mod osrm;
mod render;
mod summary;
mod validate;
mod visualisation;

/// Routemap checks, summarises and draws the collection routes of a study
/// (points, distance and duration matrices, service times and routes).
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct RouteMap {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the data files are consistent with each other
    Validate(Validate),
    /// Print the distance and duration of every route
    Summary(Summary),
    /// Generate an html page showing the routes on an interactive map
    Visualize(Visualize),
    /// Generate an svg map of the routes over the road network
    Render(Render),
}

fn init_logging() {
    let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();
}

/// Writes the generated document to `output`, or to stdout when there is none.
pub(crate) fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            File::create(path)
                .and_then(|mut f| f.write_all(content.as_bytes()))
                .with_context(|| format!("cannot write {}", path.display()))?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    match RouteMap::parse().command {
        Command::Validate(cmd) => cmd.execute(),
        Command::Summary(cmd) => cmd.execute(),
        Command::Visualize(cmd) => cmd.execute().await,
        Command::Render(cmd) => cmd.execute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        RouteMap::command().debug_assert();
    }

    #[test]
    fn visualize_arguments() {
        let cli = RouteMap::try_parse_from([
            "routemap", "visualize", "-d", "study", "--show", "1,2", "--animate", "--loop", "-o", "map.html",
        ])
        .unwrap();
        match cli.command {
            Command::Visualize(v) => {
                assert_eq!(v.show, vec![1, 2]);
                assert!(v.animate && v.looping && !v.osrm);
                assert_eq!(v.animation_seconds, 20.0);
                assert_eq!(v.data.points_path(), Path::new("study").join("points.csv"));
                assert_eq!(v.output.as_deref(), Some(Path::new("map.html")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn explicit_files_override_the_data_dir() {
        let cli = RouteMap::try_parse_from(["routemap", "validate", "--routes", "/tmp/r.json", "--delimiter", ","]).unwrap();
        match cli.command {
            Command::Validate(v) => {
                assert_eq!(v.data.routes_path(), Path::new("/tmp/r.json"));
                assert_eq!(v.data.delimiter, ',');
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn output_goes_to_the_file() {
        let path = env::temp_dir().join(format!("routemap-output-{}.svg", std::process::id()));
        write_output(Some(&path), "<svg/>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg/>");
        std::fs::remove_file(&path).unwrap();
    }
}
