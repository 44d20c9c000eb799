use crate::mismatch::MismatchReport;
use hyper::http;
use std::{io, sync, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The mock server failed to start: {0}")]
    SetupFailed(#[source] io::Error),
    #[error("Contract verification failed:\n{0}")]
    VerificationFailed(MismatchReport),
    #[error("A mock provider is already running on this thread; finalize or drop it first")]
    SessionActive,
    #[error("Couldn't reconfigure logging: {0}")]
    LoggingFailed(String),
    #[error("The consumer call failed while exercising the mock server: {0}")]
    ExerciseFailed(String),
    #[error("Verification didn't finish within {0:?}")]
    Timeout(Duration),
    #[error("IoError: {0}")]
    IoError(#[from] io::Error),
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("The lock was poisoned")]
    PoisonedLock,
    #[error("Invalid header name")]
    InvalidHeaderName,
    #[error("Invalid header value")]
    InvalidHeaderValue,
    #[error("Invalid body")]
    InvalidBody,
    #[error("Invalid matching rule: {0}")]
    InvalidMatchingRule(String),
    #[error("Unsupported pact specification version {0}")]
    UnsupportedSpecVersion(u8),
    #[error("No contract file for provider {0} was loaded")]
    NotConfigured(String),
    #[error("Hyper error: {0}")]
    HyperError(#[from] hyper::Error),
    #[error("Http Error: {0}")]
    HttpError(#[from] http::Error),
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Self {
        Error::PoisonedLock
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::InvalidMatchingRule(e.to_string())
    }
}
