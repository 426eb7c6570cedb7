use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::PolicyError;
use crate::policy::{self, Policy};
use crate::preprocess::ImputeStrategy;

/// Runtime settings, read from the environment (and a `.env` file when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub report_dir: PathBuf,
    pub policy_path: Option<PathBuf>,
    pub impute_strategy: ImputeStrategy,
    pub database_url: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let report_dir = env::var("REPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("reports/tables"));
        let policy_path = non_empty_var("POLICY_PATH").map(PathBuf::from);
        let impute_strategy = match non_empty_var("IMPUTE_STRATEGY") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidImputeStrategy(value))?,
            None => ImputeStrategy::default(),
        };
        let database_url = non_empty_var("DATABASE_URL");

        Ok(Self {
            log_level,
            report_dir,
            policy_path,
            impute_strategy,
            database_url,
        })
    }

    /// Policy from `explicit`, else `POLICY_PATH`, else the built-in default.
    pub fn resolve_policy(&self, explicit: Option<&PathBuf>) -> Result<Policy, ConfigError> {
        match explicit.or(self.policy_path.as_ref()) {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::PolicyFile {
                    path: path.clone(),
                    source,
                })?;
                Ok(policy::parse_and_validate(&raw)?)
            }
            None => Ok(Policy::default()),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IMPUTE_STRATEGY must be 'median' or 'mean' (got '{0}')")]
    InvalidImputeStrategy(String),
    #[error("unable to read policy file {}: {source}", .path.display())]
    PolicyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Policy(#[from] PolicyError),
}
