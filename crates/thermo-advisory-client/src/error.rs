use thermo_advisory_core::InputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with status {status}")]
    Status { status: u16, url: String },
    #[error("undecodable response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A scenario analysis that could not produce advice. Collapses to the fixed
/// error result for the user; the cause is only logged.
#[derive(Debug, Error)]
pub enum SubmissionFailure {
    #[error("scenario input rejected: {0}")]
    Input(#[from] InputError),
    #[error("advice request failed: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
#[error("history fetch failed: {0}")]
pub struct HistoryFetchFailure(#[from] pub TransportError);
