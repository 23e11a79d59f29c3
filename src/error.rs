use thiserror::Error;

/// Failure taxonomy of the sync engine and the ruler.
///
/// None of these reach the host as a panic: event handlers log them and
/// carry on. They surface as values only from the lower-level helpers
/// (point resolution, message admission) so that tests can assert on them.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SyncError {
    /// The pointer does not map to a valid time/price pair.
    #[error("pointer does not resolve to a time and price")]
    UnresolvablePoint,

    /// A message at or below the consumer watermark.
    #[error("stale message: sequence {sequence} <= watermark {watermark}")]
    StaleMessage { sequence: u64, watermark: u64 },

    /// A conversion of the external chart returned nothing.
    #[error("no coordinate mapping for {0}")]
    MissingCoordinateMapping(&'static str),

    /// No answer to a range request within the configured bound.
    #[error("range request timed out")]
    Timeout,
}

pub type SyncResult<T> = Result<T, SyncError>;
