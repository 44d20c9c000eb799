#[cfg(test)]
mod tests {
    use contract_kit::{
        consumer_contract_test, like, Contract, Interaction, MockProvider, MockServerConfig,
        RequestPattern, ResponsePattern,
    };
    use serde_json::{json, Value};

    fn configure_contract(config: &mut MockServerConfig) {
        let dir = std::env::temp_dir().join("contract-kit-tests");
        config.set_port(0);
        config.set_contract_dir(dir.join("pacts"));
        config.set_log_path(dir.join("logs/pact.log"));
    }

    fn ping_interaction() -> Interaction {
        Interaction::new("a ping")
            .upon_receiving(RequestPattern::get("/ping"))
            .will_respond_with(
                ResponsePattern::new(200)
                    .with_header("Content-Type", "application/json")
                    .with_body(like(json!({ "pong": true }))),
            )
    }

    #[consumer_contract_test("smokeConsumer", "pingProvider", configure_contract)]
    fn simple_contract_test(mock_provider: &MockProvider) {
        mock_provider.add_interaction(ping_interaction()).unwrap();

        let body: Value = reqwest::blocking::get(format!("{}/ping", mock_provider.url()))
            .unwrap()
            .json()
            .unwrap();

        assert_eq!(body, json!({ "pong": true }));
        assert_eq!(
            mock_provider.contract().unwrap().interactions,
            vec![ping_interaction()]
        );
    }

    #[consumer_contract_test("smokeConsumer", "silentProvider", configure_contract)]
    #[should_panic(expected = "Contract Error")]
    fn unexercised_contract_test(mock_provider: &MockProvider) {
        mock_provider.add_interaction(ping_interaction()).unwrap();
    }

    #[consumer_contract_test("smokeConsumer", "panickingProvider", configure_contract)]
    #[should_panic(expected = "the consumer blew up")]
    fn panicking_contract_test(mock_provider: &MockProvider) {
        mock_provider.add_interaction(ping_interaction()).unwrap();
        panic!("the consumer blew up");
    }

    #[test]
    fn panicking_contract_test_still_writes_its_contract() {
        // runs the same flow as the macro so the written file can be inspected afterwards
        let dir = tempfile::tempdir().unwrap();
        let mut config = MockServerConfig::new("smokeConsumer", "recordedProvider");
        config.set_port(0);
        config.set_contract_dir(dir.path().join("pacts"));
        config.set_log_path(dir.path().join("logs/pact.log"));

        let mock_provider = MockProvider::setup(config).unwrap();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            mock_provider.add_interaction(ping_interaction()).unwrap();
            panic!("the consumer blew up");
        }));
        let path = mock_provider.finalize().unwrap();

        assert!(outcome.is_err());
        assert_eq!(
            Contract::load(path).unwrap().interactions,
            vec![ping_interaction()]
        );
    }
}
