use anyhow::{bail, Context};
use clap::Args;

use crate::dataset::{DataFiles, Dataset};

/// This command checks that the data files agree with each other: matrix
/// sizes, service time count and route indices against the points table.
#[derive(Debug, Args)]
pub struct Validate {
    #[clap(flatten)]
    pub data: DataFiles,
}

impl Validate {
    /// Executes this command, failing when the dataset has errors
    pub fn execute(&self) -> anyhow::Result<()> {
        let dataset = Dataset::load(&self.data).context("cannot load the data files")?;
        let report = dataset.validate();
        for issue in &report.issues {
            println!("{issue}");
        }

        let errors = report.errors().count();
        let warnings = report.warnings().count();
        if !report.is_valid() {
            bail!("the dataset is invalid: {errors} errors, {warnings} warnings");
        }
        log::info!(
            "{} points, {} routes: dataset is valid ({warnings} warnings)",
            dataset.points.len(),
            dataset.routes.len()
        );
        Ok(())
    }
}
