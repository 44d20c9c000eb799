mod common;

use chuck_joke_client::{Credentials, DEFAULT_BASE_URL};
use common::{record_contract, CONSUMER, PROVIDER};
use contract_kit::{
    Error, Interaction, Mismatch, MismatchReport, MockProvider, MockServerConfig, RequestPattern,
    ResponsePattern, Verifier, VerifierOptions,
};
use serde_json::{json, Value};
use std::{path::Path, time::Duration};

const CONTRACT_PATH: &str = "pacts/jokeConsumer-jokeProvider.json";

#[tokio::test]
#[ignore = "replays the recorded contract against the live jokes API"]
async fn live_api_honours_the_contract() {
    let mut options = VerifierOptions::new(PROVIDER, DEFAULT_BASE_URL);
    options.add_contract_path(CONTRACT_PATH);
    options.set_timeout(Duration::from_secs(30));
    for (name, value) in Credentials::from_env().headers() {
        options.add_custom_header(name, value);
    }

    match Verifier::new(options).verify_provider().await {
        Ok(report) => println!("Contract verification complete!\n{}", report),
        Err(e) => panic!("Contract verification failed: {}", e),
    }
}

/// Serves a single canned `/jokes/random` response, standing in for the real provider.
fn stub_provider(dir: &Path, body: Value) -> MockProvider {
    let mut config = MockServerConfig::new("jokeVerifierTests", PROVIDER);
    config.set_port(0);
    config.set_contract_dir(dir.join("stub"));
    config.set_log_path(dir.join("logs/stub.log"));

    let stub = MockProvider::setup(config).unwrap();
    stub.add_interaction(
        Interaction::new("a random joke")
            .upon_receiving(
                RequestPattern::get("/jokes/random").with_header("Accept", "application/json"),
            )
            .will_respond_with(
                ResponsePattern::new(200)
                    .with_header("Content-Type", "application/json; charset=utf-8")
                    .with_body(body),
            ),
    )
    .unwrap();

    stub
}

fn verify_against(stub: &MockProvider, contract_path: &Path) -> Result<MismatchReport, Error> {
    let mut options = VerifierOptions::new(PROVIDER, stub.url());
    options.add_contract_path(contract_path);
    options.set_timeout(Duration::from_secs(5));
    options.add_state_handler("all locations are available", |_| Ok(()));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(Verifier::new(options).verify_provider())
}

#[test]
fn recorded_contract_accepts_a_different_joke() {
    let dir = tempfile::tempdir().unwrap();
    let contract_path = record_contract(dir.path());

    let stub = stub_provider(
        dir.path(),
        json!({
            "categories": [],
            "created_at": "2020-01-05 13:42:19.576875",
            "icon_url": "https://api.chucknorris.io/img/avatar/chuck-norris.png",
            "id": "dU8JS-1VR1ilWmcydiGu3g",
            "url": "https://api.chucknorris.io/jokes/dU8JS-1VR1ilWmcydiGu3g",
            "value": "Chuck Norris counted to infinity. Twice."
        }),
    );

    let report = verify_against(&stub, &contract_path).unwrap();

    assert!(report.is_success());
    assert_eq!(report.interactions[0].description, "a request for all locations");
    // the replayed request matched the recorded method, path and Accept header
    assert!(stub.verify().is_ok());
    assert!(contract_path.ends_with(format!("{}-{}.json", CONSUMER, PROVIDER)));
}

#[test]
fn joke_without_value_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let contract_path = record_contract(dir.path());

    let stub = stub_provider(
        dir.path(),
        json!({
            "icon_url": "",
            "id": "abc123",
            "url": ""
        }),
    );

    match verify_against(&stub, &contract_path) {
        Err(Error::VerificationFailed(report)) => {
            assert!(report.mismatches().any(|mismatch| matches!(
                mismatch,
                Mismatch::Body { path, .. } if path == "$.body.value"
            )));
        }
        other => panic!("Verification should fail on the missing value: {:?}", other),
    }
}
