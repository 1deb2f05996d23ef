use std::io;
use std::process::ExitCode;
use thiserror::Error;
use voxmetric::VoxMetricError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Metric(#[from] VoxMetricError),
    #[error("worker pool: {0}")]
    Pool(String),
    #[error("{failed} of {total} subjects failed")]
    Batch { failed: usize, total: usize },
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Io(_) | CliError::Pool(_) => 1,
            CliError::Config(_) | CliError::Json(_) => 2,
            CliError::Metric(err) => match err {
                VoxMetricError::DependencyUnavailable { .. } => 3,
                VoxMetricError::ShapeMismatch { .. }
                | VoxMetricError::NonFiniteVoxel { .. }
                | VoxMetricError::InvalidConfiguration { .. }
                | VoxMetricError::InvalidDimensions { .. }
                | VoxMetricError::BufferTooSmall { .. } => 2,
                _ => 1,
            },
            CliError::Batch { .. } => 4,
        }
    }
}

impl From<&CliError> for ExitCode {
    fn from(value: &CliError) -> Self {
        ExitCode::from(value.exit_code())
    }
}
