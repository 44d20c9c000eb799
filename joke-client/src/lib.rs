//! A small client for the Chuck Norris jokes API.

mod credentials;
mod data;
mod error;
mod joke_api_client;

pub use credentials::Credentials;
pub use data::joke::Joke;
pub use error::{Error, FetchFailure};
pub use joke_api_client::{JokeApiClient, JokeApiClientBuilder, DEFAULT_BASE_URL};
