use crate::{
    config::{ExerciseMode, MockServerConfig},
    contract::{Contract, Interaction},
    error::Error,
    logging,
    mismatch::MismatchReport,
    mock_server::MockServer,
};
use lazy_static::lazy_static;
use std::{
    fmt::Display,
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};
use tracing::{error, info, warn};

lazy_static! {
    static ref SESSION_LOCK: Mutex<()> = Mutex::new(());
    static ref SESSION_OWNER: Mutex<Option<ThreadId>> = Mutex::new(None);
}

/// A running mock provider for one consumer contract test.
///
/// Only one exists per process at a time: `setup` waits until the previous one is finalized or
/// dropped, so tests sharing a fixed port don't race for it. Setting up a second one on the thread
/// that still holds the first fails with [`Error::SessionActive`] instead of waiting forever.
#[derive(Debug)]
pub struct MockProvider {
    config: MockServerConfig,
    server: MockServer,
    _session: MutexGuard<'static, ()>,
}

impl MockProvider {
    pub fn setup(config: MockServerConfig) -> Result<Self, Error> {
        if *session_owner() == Some(thread::current().id()) {
            return Err(Error::SessionActive);
        }

        // a test that panicked while holding the session still released the port
        let session = SESSION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        *session_owner() = Some(thread::current().id());

        if let Err(e) = logging::init(config.log_path(), config.log_level()) {
            warn!("Couldn't open log file {}: {}", config.log_path().display(), e);
        }

        let server = match MockServer::start(config.port()) {
            Ok(server) => server,
            Err(e) => {
                error!(port = config.port(), "mock server setup failed: {}", e);
                logging::close();
                release_session();
                return Err(e);
            }
        };

        info!(
            consumer = config.consumer(),
            provider = config.provider(),
            port = server.port(),
            "mock server started"
        );

        Ok(Self {
            config,
            server,
            _session: session,
        })
    }

    pub fn config(&self) -> &MockServerConfig {
        &self.config
    }

    pub fn port(&self) -> u16 {
        self.server.port()
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port())
    }

    pub fn add_interaction(&self, interaction: Interaction) -> Result<(), Error> {
        info!(
            description = %interaction.description,
            provider_state = ?interaction.provider_state,
            "registering interaction"
        );
        self.server.state().lock()?.register(interaction);
        Ok(())
    }

    /// Runs the consumer call against the mock. In lenient mode a failed call is only logged and
    /// `Ok(None)` is returned; verification then decides the outcome.
    pub fn exercise<T, E: Display, F: FnOnce() -> Result<T, E>>(
        &self,
        consumer_call: F,
    ) -> Result<Option<T>, Error> {
        match consumer_call() {
            Ok(value) => {
                info!("consumer call succeeded");
                Ok(Some(value))
            }
            Err(e) => match self.config.exercise_mode() {
                ExerciseMode::Lenient => {
                    error!("consumer call failed: {}", e);
                    Ok(None)
                }
                ExerciseMode::Strict => Err(Error::ExerciseFailed(e.to_string())),
            },
        }
    }

    /// Checks every registered interaction was received as specified and nothing else was.
    pub fn verify(&self) -> Result<MismatchReport, Error> {
        let report = self.server.state().lock()?.report();

        if report.is_success() {
            info!("all interactions verified");
            Ok(report)
        } else {
            error!("interaction verification failed:\n{}", report);
            Err(Error::VerificationFailed(report))
        }
    }

    pub fn contract(&self) -> Result<Contract, Error> {
        let mut contract = Contract::new(
            self.config.consumer(),
            self.config.provider(),
            self.config.spec_version(),
        );

        for interaction in self.server.state().lock()?.interactions() {
            contract.add_interaction(interaction.clone());
        }

        Ok(contract)
    }

    /// Writes the contract file and stops the server. The server is stopped even if writing fails.
    pub fn finalize(mut self) -> Result<PathBuf, Error> {
        let written = self
            .contract()
            .and_then(|contract| self.config.contract_store().save_contract(&contract));
        self.server.stop();

        match &written {
            Ok(path) => info!(path = %path.display(), "contract written"),
            Err(e) => error!("Couldn't write the contract: {}", e),
        }

        written
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.server.stop();
        logging::close();
        release_session();
    }
}

fn session_owner() -> MutexGuard<'static, Option<ThreadId>> {
    SESSION_OWNER.lock().unwrap_or_else(PoisonError::into_inner)
}

fn release_session() {
    *session_owner() = None;
}
