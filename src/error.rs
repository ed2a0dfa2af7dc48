use thiserror::Error;

/// Errors that stop a run. Worker misbehaviour is never one of these: it is
/// recorded as a non-clean trial instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected before any worker starts
    #[error("configuration error: {0}")]
    Config(String),

    /// The report could not be persisted
    #[error("failed to write report: {0}")]
    ReportWrite(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
