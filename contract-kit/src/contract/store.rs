use super::{file_name, Contract};
use crate::error::Error;
use std::{fmt::Debug, fs, path::PathBuf};
use tracing::debug;

pub trait ContractStore: Debug {
    fn load_contract(&self, consumer: &str, provider: &str) -> Result<Option<Contract>, Error>;
    fn save_contract(&self, contract: &Contract) -> Result<PathBuf, Error>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WriteMode {
    /// Replace whatever file is there.
    Overwrite,
    /// Keep interactions already in the file, replacing the ones recorded again.
    Merge,
}

/// Stores contracts as `<dir>/<consumer>-<provider>.json`.
#[derive(Debug, Clone)]
pub struct PactDirectory {
    dir: PathBuf,
    write_mode: WriteMode,
}

impl PactDirectory {
    pub fn new<P: Into<PathBuf>>(dir: P, write_mode: WriteMode) -> Self {
        Self {
            dir: dir.into(),
            write_mode,
        }
    }

    pub fn contract_path(&self, consumer: &str, provider: &str) -> PathBuf {
        self.dir.join(file_name(consumer, provider))
    }
}

impl ContractStore for PactDirectory {
    fn load_contract(&self, consumer: &str, provider: &str) -> Result<Option<Contract>, Error> {
        let path = self.contract_path(consumer, provider);

        if !path.exists() {
            return Ok(None);
        }

        Contract::load(path).map(Some)
    }

    fn save_contract(&self, contract: &Contract) -> Result<PathBuf, Error> {
        fs::create_dir_all(&self.dir)?;
        let path = self.contract_path(&contract.consumer, &contract.provider);

        let contract = match self.write_mode {
            WriteMode::Overwrite => contract.clone(),
            WriteMode::Merge => match self.load_contract(&contract.consumer, &contract.provider)? {
                Some(mut existing) => {
                    debug!(path = %path.display(), "merging into existing contract file");
                    existing.spec_version = contract.spec_version;
                    existing.merge(contract.clone());
                    existing
                }
                None => contract.clone(),
            },
        };

        contract.save(&path)?;

        Ok(path)
    }
}
