use crate::error::{LaneError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

/// Handle to the run's log file, kept so it can be printed at the end
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Contents written so far
    pub fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| LaneError::resource(&self.path, e))
    }
}

/// Install the global subscriber: stdout plus `<log_dir>/lane_detection_<timestamp>.log`
pub fn init(log_dir: &Path, timestamp: &str, debug: bool) -> Result<RunLog> {
    std::fs::create_dir_all(log_dir).map_err(|e| LaneError::resource(log_dir, e))?;

    let path = log_dir.join(format!("lane_detection_{timestamp}.log"));
    let file = File::create(&path).map_err(|e| LaneError::resource(&path, e))?;

    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(level)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| {
            LaneError::resource(
                &path,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, e.to_string()),
            )
        })?;

    Ok(RunLog { path })
}
