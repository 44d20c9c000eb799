use chuck_joke_client::JokeApiClientBuilder;
use contract_kit::{like, Interaction, MockProvider, MockServerConfig, RequestPattern, ResponsePattern};
use serde_json::json;
use std::path::{Path, PathBuf};

pub const CONSUMER: &str = "jokeConsumer";
pub const PROVIDER: &str = "jokeProvider";

/// The one interaction the joke consumer relies on. Only the shape of the body is fixed.
pub fn random_joke_interaction() -> Interaction {
    Interaction::new("a request for all locations")
        .given("all locations are available")
        .upon_receiving(
            RequestPattern::get("/jokes/random").with_header("Accept", "application/json"),
        )
        .will_respond_with(
            ResponsePattern::new(200)
                .with_header("Content-Type", "application/json")
                .with_body(like(json!({
                    "icon_url": "https://api.chucknorris.io/img/avatar/chuck-norris.png",
                    "id": "dU8JS-1VR1ilWmcydiGu3g",
                    "url": "",
                    "value": "Titanic did'nt sink because of an iceberg, it hit Chuck Norris on his morning swim..."
                }))),
        )
}

/// Runs the consumer side against a mock on an ephemeral port and returns the written contract.
#[allow(dead_code)]
pub fn record_contract(dir: &Path) -> PathBuf {
    let mut config = MockServerConfig::new(CONSUMER, PROVIDER);
    config.set_port(0);
    config.set_contract_dir(dir.join("pacts"));
    config.set_log_path(dir.join("logs/pact.log"));

    let mock_provider = MockProvider::setup(config).unwrap();
    mock_provider.add_interaction(random_joke_interaction()).unwrap();

    JokeApiClientBuilder::new()
        .with_base_url(mock_provider.url())
        .build()
        .fetch_random_joke()
        .unwrap();

    mock_provider.verify().unwrap();
    mock_provider.finalize().unwrap()
}
