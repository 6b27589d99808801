//! Configuration loaded from TOML.
//!
//! ```toml
//! inherit_env = true
//! environment = "PREFIX=/opt/tool BIN=$PREFIX/bin"
//!
//! [executor]
//! inherit_env = false
//! working_dir = "/tmp"
//! ```

use crate::shell::{
    parse_environment, EnvParseError, Environment, EvalError, Executor, ProcessExecutor,
};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings for the default [`ProcessExecutor`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Let child processes see the calling process's environment in addition
    /// to the evaluation environment.
    pub inherit_env: bool,
    /// Working directory for child processes.
    pub working_dir: Option<PathBuf>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Seed the evaluation environment from the current process.
    pub inherit_env: bool,
    /// Assignment list applied on top of the base environment.
    pub environment: Option<String>,
    pub executor: ExecutorConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Environment(#[from] EnvParseError),
    #[error("failed to evaluate config environment: {0}")]
    Evaluate(#[from] EvalError),
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Self::from_toml_str(&text)
    }

    /// The default executor, configured from the `[executor]` table.
    pub fn executor(&self) -> ProcessExecutor {
        ProcessExecutor::new(self.executor.clone())
    }

    /// The environment expressions start from, before any assignment list.
    pub fn base_environment(&self) -> Environment {
        if self.inherit_env {
            std::env::vars_os()
                .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                    (Ok(key), Ok(value)) => Some((key, value)),
                    (key, _) => {
                        tracing::debug!(?key, "skipping non-UTF-8 environment variable");
                        None
                    }
                })
                .collect()
        } else {
            Environment::new()
        }
    }

    /// Build the evaluation environment: the base environment with the
    /// configured assignment list applied in order.
    pub fn build_environment(&self, executor: &dyn Executor) -> Result<Environment, ConfigError> {
        let base = self.base_environment();
        match &self.environment {
            Some(text) => Ok(parse_environment(text)?.as_environment(&base, executor)?),
            None => Ok(base),
        }
    }
}
