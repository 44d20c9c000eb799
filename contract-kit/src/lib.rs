//! Consumer-driven contract testing over HTTP.
//!
//! A consumer test starts a [`MockProvider`], registers the interactions it expects, drives its
//! client against the mock and finally writes the recorded [`Contract`] to a Pact JSON file. A
//! provider test hands that file to a [`Verifier`], which replays each request against the real
//! service and checks the responses still have the recorded shape.

mod config;
mod contract;
mod data;
mod error;
mod http_client;
pub mod logging;
pub mod matchers;
mod mismatch;
mod mock_server;
mod session;
mod util;
mod verifier;

pub use config::{ExerciseMode, LogLevel, MockServerConfig};
pub use contract::{
    Contract, ContractStore, Interaction, PactDirectory, RequestPattern, ResponsePattern,
    SpecVersion, WriteMode,
};
pub use contract_kit_codegen::consumer_contract_test;
pub use data::{RequestData, ResponseData};
pub use error::Error;
pub use http_client::{HttpClient, HyperHttpClient};
pub use matchers::{each_like, like, term, Pattern};
pub use mismatch::{InteractionResult, Mismatch, MismatchReport};
pub use session::MockProvider;
pub use verifier::{StateHandler, Verifier, VerifierOptions, DEFAULT_TIMEOUT};
