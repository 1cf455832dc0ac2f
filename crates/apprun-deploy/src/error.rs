use apprun_client::ClientError;
use thiserror::Error;

use crate::block_map::BlockMapError;

/// Invalid or missing step inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingInput(String),

    #[error("{0} is not a valid number: NaN")]
    InvalidNumber(String),

    #[error("Invalid maxCPU and maxMemory value")]
    InvalidResources { max_cpu: String, max_memory: String },

    #[error(
        "Input does not meet YAML 1.2 \"Core Schema\" specification: {0}\n\
         Support boolean input list: `true | True | TRUE | false | False | FALSE`"
    )]
    InvalidBoolean(String),

    #[error(transparent)]
    StructuredText(#[from] BlockMapError),

    #[error("packet_filter_allowlist entry is not a valid CIDR: {0}")]
    InvalidCidr(String),
}

impl ConfigError {
    pub fn missing_input(key: impl Into<String>) -> Self {
        Self::MissingInput(key.into())
    }

    pub fn invalid_number(key: impl Into<String>) -> Self {
        Self::InvalidNumber(key.into())
    }

    pub fn invalid_boolean(key: impl Into<String>) -> Self {
        Self::InvalidBoolean(key.into())
    }

    pub fn invalid_resources(max_cpu: impl Into<String>, max_memory: impl Into<String>) -> Self {
        Self::InvalidResources {
            max_cpu: max_cpu.into(),
            max_memory: max_memory.into(),
        }
    }

    pub fn invalid_cidr(entry: impl Into<String>) -> Self {
        Self::InvalidCidr(entry.into())
    }
}

/// Any failure that aborts a deployment run.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type Result<T> = std::result::Result<T, DeployError>;
