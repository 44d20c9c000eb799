use crate::{
    contract::{ContractStore, PactDirectory, SpecVersion, WriteMode},
    error::Error,
};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

pub const DEFAULT_PORT: u16 = 1234;
pub const DEFAULT_LOG_PATH: &str = "logs/pact.log";
pub const DEFAULT_CONTRACT_DIR: &str = "pacts";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(level: &str) -> Result<Self, Self::Err> {
        match level.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level {}", other)),
        }
    }
}

/// What happens when the consumer call itself fails while the mock server is armed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExerciseMode {
    /// The failure is logged and the test outcome is left to interaction verification. A broken
    /// client that still sends the expected request passes in this mode.
    Lenient,
    /// The failure fails the test.
    Strict,
}

#[derive(Debug)]
pub struct MockServerConfig {
    consumer: String,
    provider: String,
    port: u16,
    log_path: PathBuf,
    contract_dir: PathBuf,
    log_level: LogLevel,
    spec_version: SpecVersion,
    write_mode: WriteMode,
    exercise_mode: ExerciseMode,
    contract_store: Option<Arc<dyn ContractStore + Send + Sync>>,
}

impl MockServerConfig {
    pub fn new<S1: Into<String>, S2: Into<String>>(consumer: S1, provider: S2) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            port: DEFAULT_PORT,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            contract_dir: PathBuf::from(DEFAULT_CONTRACT_DIR),
            log_level: LogLevel::Info,
            spec_version: SpecVersion::V2,
            write_mode: WriteMode::Overwrite,
            exercise_mode: ExerciseMode::Lenient,
            contract_store: None,
        }
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Port 0 picks a free port, which [`MockProvider::port`](crate::MockProvider::port) reports.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_log_path<P: Into<PathBuf>>(&mut self, log_path: P) {
        self.log_path = log_path.into();
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn set_contract_dir<P: Into<PathBuf>>(&mut self, contract_dir: P) {
        self.contract_dir = contract_dir.into();
    }

    pub fn contract_dir(&self) -> &Path {
        &self.contract_dir
    }

    pub fn set_log_level(&mut self, log_level: LogLevel) {
        self.log_level = log_level;
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn set_spec_version(&mut self, version: u8) -> Result<(), Error> {
        self.spec_version = SpecVersion::try_from(version)?;
        Ok(())
    }

    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }

    pub fn set_write_mode(&mut self, write_mode: WriteMode) {
        self.write_mode = write_mode;
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    pub fn set_exercise_mode(&mut self, exercise_mode: ExerciseMode) {
        self.exercise_mode = exercise_mode;
    }

    pub fn exercise_mode(&self) -> ExerciseMode {
        self.exercise_mode
    }

    pub fn set_contract_store(&mut self, store: Arc<dyn ContractStore + Send + Sync>) {
        self.contract_store = Some(store);
    }

    pub fn contract_store(&self) -> Arc<dyn ContractStore + Send + Sync> {
        self.contract_store.clone().unwrap_or_else(|| {
            Arc::new(PactDirectory::new(
                self.contract_dir.clone(),
                self.write_mode,
            ))
        })
    }

    pub fn contract_path(&self) -> PathBuf {
        PactDirectory::new(self.contract_dir.clone(), self.write_mode)
            .contract_path(&self.consumer, &self.provider)
    }
}
