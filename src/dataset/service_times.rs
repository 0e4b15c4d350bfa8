use std::{io::Read, time::Duration};

use serde::Deserialize;

use crate::error::DataError;

#[derive(Debug, Deserialize)]
struct ServiceTimeRecord {
    service_time: f64,
}

/// Reads the time spent at each point (depot included), in points order.
/// Values are seconds.
pub fn read_service_times<R: Read>(reader: R) -> Result<Vec<Duration>, DataError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut times = vec![];
    for (row, record) in csv.deserialize().enumerate() {
        let ServiceTimeRecord { service_time } = record?;
        let time = Duration::try_from_secs_f64(service_time)
            .map_err(|_| DataError::InvalidServiceTime { row, value: service_time })?;
        times.push(time);
    }
    Ok(times)
}
