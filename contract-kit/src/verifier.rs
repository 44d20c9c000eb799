use crate::{
    contract::{Contract, Interaction},
    data::RequestData,
    error::Error,
    http_client::{HttpClient, HyperHttpClient},
    mismatch::{InteractionResult, Mismatch, MismatchReport},
};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Debug},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tracing::{debug, error, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Puts the provider into a named state before the interactions needing it are replayed.
pub type StateHandler =
    Box<dyn Fn(&str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

pub struct VerifierOptions {
    provider: String,
    provider_base_url: String,
    contract_paths: Vec<PathBuf>,
    timeout: Duration,
    custom_headers: BTreeMap<String, String>,
    state_handlers: HashMap<String, StateHandler>,
    http_client: Option<Arc<dyn HttpClient + Send + Sync>>,
}

impl VerifierOptions {
    pub fn new<S1: Into<String>, S2: Into<String>>(provider: S1, provider_base_url: S2) -> Self {
        Self {
            provider: provider.into(),
            provider_base_url: provider_base_url.into(),
            contract_paths: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            custom_headers: BTreeMap::new(),
            state_handlers: HashMap::new(),
            http_client: None,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn provider_base_url(&self) -> &str {
        &self.provider_base_url
    }

    pub fn add_contract_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.contract_paths.push(path.into());
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sent with every replayed request, replacing a recorded header of the same name.
    pub fn add_custom_header<S1: Into<String>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        self.custom_headers.insert(name.into(), value.into());
    }

    pub fn add_state_handler<S, F>(&mut self, state: S, handler: F)
    where
        S: Into<String>,
        F: Fn(&str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        self.state_handlers.insert(state.into(), Box::new(handler));
    }

    pub fn set_http_client(&mut self, http_client: Arc<dyn HttpClient + Send + Sync>) {
        self.http_client = Some(http_client);
    }

    pub fn http_client(&self) -> Arc<dyn HttpClient + Send + Sync> {
        self.http_client
            .clone()
            .unwrap_or_else(|| Arc::new(HyperHttpClient::new()))
    }
}

impl Debug for VerifierOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierOptions")
            .field("provider", &self.provider)
            .field("provider_base_url", &self.provider_base_url)
            .field("contract_paths", &self.contract_paths)
            .field("timeout", &self.timeout)
            .field("custom_headers", &self.custom_headers.keys())
            .field("state_handlers", &self.state_handlers.keys())
            .finish()
    }
}

/// Replays recorded contracts against a running provider.
#[derive(Debug)]
pub struct Verifier {
    options: VerifierOptions,
}

impl Verifier {
    pub fn new(options: VerifierOptions) -> Self {
        Self { options }
    }

    /// Replays every interaction of every contract for this provider. Any mismatch or transport
    /// error fails the run with the full report; so does exceeding the timeout.
    pub async fn verify_provider(&self) -> Result<MismatchReport, Error> {
        let timeout = self.options.timeout;

        match tokio::time::timeout(timeout, self.replay_contracts()).await {
            Ok(result) => result,
            Err(_) => {
                error!(?timeout, "provider verification timed out");
                Err(Error::Timeout(timeout))
            }
        }
    }

    async fn replay_contracts(&self) -> Result<MismatchReport, Error> {
        let contracts = self.load_contracts()?;
        if contracts.is_empty() {
            return Err(Error::NotConfigured(self.options.provider.clone()));
        }

        let client = self.options.http_client();
        let mut report = MismatchReport::default();

        for contract in &contracts {
            info!(
                consumer = %contract.consumer,
                provider = %contract.provider,
                base_url = %self.options.provider_base_url,
                "verifying contract"
            );

            for interaction in &contract.interactions {
                let result = self.verify_interaction(client.as_ref(), interaction).await;
                report.interactions.push(result);
            }
        }

        if report.is_success() {
            info!("provider verification passed:\n{}", report);
            Ok(report)
        } else {
            error!("provider verification failed:\n{}", report);
            Err(Error::VerificationFailed(report))
        }
    }

    fn load_contracts(&self) -> Result<Vec<Contract>, Error> {
        let mut contracts = Vec::new();

        for path in &self.options.contract_paths {
            let contract = Contract::load(path)?;

            if contract.provider == self.options.provider {
                contracts.push(contract);
            } else {
                warn!(
                    path = %path.display(),
                    provider = %contract.provider,
                    "skipping contract for another provider"
                );
            }
        }

        Ok(contracts)
    }

    async fn verify_interaction(
        &self,
        client: &(dyn HttpClient + Send + Sync),
        interaction: &Interaction,
    ) -> InteractionResult {
        let mut result = InteractionResult {
            description: interaction.description.clone(),
            provider_state: interaction.provider_state.clone(),
            mismatches: Vec::new(),
        };

        if let Some(state) = &interaction.provider_state {
            match self.options.state_handlers.get(state) {
                Some(handler) => {
                    if let Err(e) = handler(state.as_str()) {
                        result.mismatches.push(Mismatch::Transport {
                            message: format!("setting up provider state \"{}\" failed: {}", state, e),
                        });
                        return result;
                    }
                }
                None => warn!(state = %state, "no handler for provider state, replaying as is"),
            }
        }

        let request = self.request_data(interaction);
        debug!(method = %request.method, uri = %request.uri, "replaying request");

        match client
            .make_request(&self.options.provider_base_url, &request)
            .await
        {
            Ok(response) => result
                .mismatches
                .extend(interaction.response.check(&response)),
            Err(e) => result.mismatches.push(Mismatch::Transport {
                message: e.to_string(),
            }),
        }

        result
    }

    fn request_data(&self, interaction: &Interaction) -> RequestData {
        let request = &interaction.request;
        let mut headers = request
            .headers
            .iter()
            .filter(|(name, _)| {
                !self
                    .options
                    .custom_headers
                    .keys()
                    .any(|custom| custom.eq_ignore_ascii_case(name))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect::<HashMap<_, _>>();
        headers.extend(
            self.options
                .custom_headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );

        RequestData {
            uri: request.uri(),
            method: request.method.clone(),
            headers,
            body: request
                .body
                .as_ref()
                .map(|body| body.to_string())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        contract::{RequestPattern, ResponsePattern, SpecVersion},
        data::ResponseData,
        matchers::like,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::{path::Path, sync::Mutex};

    #[derive(Debug)]
    struct CannedProvider {
        body: String,
        delay: Duration,
        received: Mutex<Vec<RequestData>>,
    }

    impl CannedProvider {
        fn new(body: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_string(),
                delay: Duration::from_millis(0),
                received: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpClient for CannedProvider {
        async fn make_request(
            &self,
            _base_url: &str,
            request_data: &RequestData,
        ) -> Result<ResponseData, Error> {
            tokio::time::sleep(self.delay).await;
            self.received.lock()?.push(request_data.clone());

            Ok(ResponseData {
                status_code: 200,
                headers: vec![(
                    "content-type".to_string(),
                    "application/json;charset=UTF-8".to_string(),
                )]
                .into_iter()
                .collect(),
                body: self.body.clone(),
            })
        }
    }

    fn write_joke_contract(dir: &Path) -> PathBuf {
        let mut contract = Contract::new("jokeConsumer", "jokeProvider", SpecVersion::V2);
        contract.add_interaction(
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
                            "value": "Chuck Norris counted to infinity. Twice."
                        }))),
                ),
        );

        let path = dir.join(contract.file_name());
        contract.save(&path).unwrap();
        path
    }

    fn options(contract_path: PathBuf, client: Arc<CannedProvider>) -> VerifierOptions {
        let mut options = VerifierOptions::new("jokeProvider", "https://api.chucknorris.io");
        options.add_contract_path(contract_path);
        options.set_http_client(client);
        options
    }

    #[tokio::test]
    async fn passes_when_provider_returns_same_shape() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CannedProvider::new(json!({
            "icon_url": "https://assets.chucknorris.host/img/avatar/chuck-norris.png",
            "id": "2wzginmks8azrbaxnamxdw",
            "url": "https://api.chucknorris.io/jokes/2wzginmks8azrbaxnamxdw",
            "value": "Chuck Norris can unscramble an egg.",
            "categories": []
        }));

        let report = Verifier::new(options(write_joke_contract(dir.path()), provider.clone()))
            .verify_provider()
            .await
            .unwrap();

        assert!(report.is_success());
        let received = provider.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].method, "GET");
        assert_eq!(received[0].uri, "/jokes/random");
        assert_eq!(received[0].headers["Accept"], "application/json");
    }

    #[tokio::test]
    async fn missing_value_fails_with_structural_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CannedProvider::new(json!({ "icon_url": "", "id": "x", "url": "" }));

        let result = Verifier::new(options(write_joke_contract(dir.path()), provider))
            .verify_provider()
            .await;

        match result {
            Err(Error::VerificationFailed(report)) => {
                assert_eq!(
                    report.mismatches().collect::<Vec<_>>(),
                    vec![&Mismatch::Body {
                        path: "$.body.value".into(),
                        message: "expected key \"value\" is missing".into(),
                    }]
                );
                assert!(report.to_string().contains("$.body.value"));
            }
            other => panic!("verification should fail, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(CannedProvider {
            body: "{}".into(),
            delay: Duration::from_secs(5),
            received: Mutex::new(Vec::new()),
        });
        let mut options = options(write_joke_contract(dir.path()), provider);
        options.set_timeout(Duration::from_millis(50));

        let result = Verifier::new(options).verify_provider().await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn runs_state_handler_and_sends_custom_headers() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CannedProvider::new(json!({
            "icon_url": "", "id": "x", "url": "", "value": "v"
        }));
        let states = Arc::new(Mutex::new(Vec::new()));
        let seen = states.clone();
        let mut options = options(write_joke_contract(dir.path()), provider.clone());
        options.add_custom_header("Authorization", "Bearer token");
        options.add_state_handler(
            "all locations are available",
            move |state| {
                seen.lock().unwrap().push(state.to_string());
                Ok(())
            },
        );

        Verifier::new(options).verify_provider().await.unwrap();

        assert_eq!(*states.lock().unwrap(), vec!["all locations are available"]);
        let received = provider.received.lock().unwrap();
        assert_eq!(received[0].headers["Authorization"], "Bearer token");
    }

    #[tokio::test]
    async fn contracts_for_other_providers_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CannedProvider::new(json!({}));
        let mut options = VerifierOptions::new("someoneElse", "http://127.0.0.1:1");
        options.add_contract_path(write_joke_contract(dir.path()));
        options.set_http_client(provider);

        let result = Verifier::new(options).verify_provider().await;

        assert!(matches!(result, Err(Error::NotConfigured(_))));
    }
}
