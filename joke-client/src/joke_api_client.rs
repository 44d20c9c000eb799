use crate::credentials::Credentials;
use crate::data::joke::Joke;
use crate::error::{Error, FetchFailure};
use reqwest::header::ACCEPT;
use tracing::debug;
type ReqwestClient = reqwest::blocking::Client;

pub const DEFAULT_BASE_URL: &str = "https://api.chucknorris.io";
const RANDOM_JOKE_PATH: &str = "/jokes/random";

/// Builder used to build a JokeApiClient instance
#[derive(Debug, Clone, Default)]
pub struct JokeApiClientBuilder {
    base_url: Option<String>,
    http_client: Option<ReqwestClient>,
    credentials: Credentials,
}

impl JokeApiClientBuilder {
    /// Create a new JokeApiClientBuilder instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given base URL when building a JokeApiClient instance.
    ///
    /// # Arguments
    /// `base_url` - scheme, host and optional port of the jokes API, e.g. `http://localhost:1234`.
    ///
    /// # Returns
    /// This builder.
    pub fn with_base_url<T: Into<String>>(mut self, base_url: T) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Use the given blocking reqwest client when building a JokeApiClient instance.
    ///
    /// # Arguments
    /// `client` - a pre-configured blocking reqwest client.
    ///
    /// # Returns
    /// This builder.
    pub fn with_http_client(mut self, client: ReqwestClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Send the given credentials with every request.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Consume the builder and create a JokeApiClient instance using all of the previously configured values or
    /// their defaults.
    ///
    /// # Returns
    /// A JokeApiClient instance.
    pub fn build(mut self) -> JokeApiClient {
        JokeApiClient {
            http: self.http_client.take().unwrap_or_default(),
            base_url: self
                .base_url
                .take()
                .unwrap_or_else(|| String::from(DEFAULT_BASE_URL)),
            credentials: self.credentials,
        }
    }
}

/// Struct that represents a Chuck Norris jokes API client.
#[derive(Debug, Clone)]
pub struct JokeApiClient {
    http: ReqwestClient,
    base_url: String,
    credentials: Credentials,
}

impl JokeApiClient {
    /// Create a JokeApiClient for the public API with the default reqwest client and no credentials.
    pub fn new() -> Self {
        JokeApiClientBuilder::new().build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches one random joke with `GET {base_url}/jokes/random`.
    ///
    /// # Returns
    /// The decoded joke. Any transport error, non-2xx status or undecodable body is reported as
    /// [`Error::FetchFailed`] with the cause as its source.
    pub fn fetch_random_joke(&self) -> Result<Joke, Error> {
        let url = self.construct_random_joke_url();
        debug!(url = %url, "fetching a random joke");

        let mut request = self.http.get(&url).header(ACCEPT, "application/json");
        for (name, value) in self.credentials.headers() {
            request = request.header(name, value);
        }

        let response = request.send().map_err(FetchFailure::Transport)?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "jokes API answered with an error status");
            return Err(FetchFailure::Status(status.as_u16()).into());
        }

        let response_text = response.text().map_err(FetchFailure::Transport)?;
        let joke = serde_json::from_str(&response_text).map_err(FetchFailure::Decode)?;

        Ok(joke)
    }

    fn construct_random_joke_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            RANDOM_JOKE_PATH
        )
    }
}

impl Default for JokeApiClient {
    fn default() -> Self {
        Self::new()
    }
}
