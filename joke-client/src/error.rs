use thiserror::Error;

/// Why a fetch failed. Only reachable through [`Error::source`](std::error::Error::source); the
/// error callers match on is always [`Error::FetchFailed`].
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed joke: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to fetch joke")]
    FetchFailed(#[from] FetchFailure),
}
