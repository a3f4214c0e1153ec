use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::assemble::CandidatePolicy;
use crate::linker::Strategy;
use crate::matcher::{
    MatcherKind, MatcherRegistry, DEFAULT_ADDRESS_THRESHOLD, DEFAULT_REFERENCE_THRESHOLD,
};

const ENV_PREFIX: &str = "LINKER";
const DEFAULT_FILE: &str = "linker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Chain,
    Single,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("{name} must be within [0, 1], got {value}")]
    Threshold { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub reference_threshold: f64,
    pub address_threshold: f64,
    pub strategy: StrategyKind,
    /// Matcher used when `strategy` is `single`.
    pub matcher: MatcherKind,
    pub candidate_policy: CandidatePolicy,
    pub db_path: PathBuf,
    pub derive_missing_reference: bool,
    pub source_a_label: String,
    pub source_b_label: String,
}

impl Settings {
    /// Defaults, then `linker.toml` (or `file`), then `LINKER_*` variables.
    pub fn load(file: Option<&Path>) -> Result<Self, SettingsError> {
        let builder = Config::builder()
            .set_default("reference_threshold", DEFAULT_REFERENCE_THRESHOLD)?
            .set_default("address_threshold", DEFAULT_ADDRESS_THRESHOLD)?
            .set_default("strategy", "chain")?
            .set_default("matcher", "phone")?
            .set_default("candidate_policy", "exclusive")?
            .set_default("db_path", "data/linker.sqlite")?
            .set_default("derive_missing_reference", false)?
            .set_default("source_a_label", "michelin")?
            .set_default("source_b_label", "maitre")?;

        let builder = match file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(DEFAULT_FILE).required(false)),
        };

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("reference_threshold", self.reference_threshold),
            ("address_threshold", self.address_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::Threshold { name, value });
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> MatcherRegistry {
        MatcherRegistry::new(self.reference_threshold, self.address_threshold)
    }

    pub fn strategy(&self) -> Strategy {
        match self.strategy {
            StrategyKind::Chain => Strategy::Chain,
            StrategyKind::Single => Strategy::Single(self.matcher),
        }
    }
}
