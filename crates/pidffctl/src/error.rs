//! Error types for pidffctl

use pidff_errors::PidError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid capability table {path}: {message}")]
    InvalidCapabilities { path: String, message: String },

    #[error("Invalid effect file {path}: {message}")]
    InvalidEffect { path: String, message: String },

    #[error("Invalid report: {0}")]
    InvalidReport(String),

    #[error("Engine error: {0}")]
    Engine(#[from] PidError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidCapabilities { .. } => 3,
            CliError::InvalidEffect { .. }
            | CliError::InvalidReport(_)
            | CliError::JsonError(_)
            | CliError::YamlError(_) => 4,
            CliError::Engine(e) if e.is_caller_fixable() => 4,
            CliError::Engine(_) => 5,
            CliError::IoError(_) => 2,
        }
    }

    /// Short machine-readable name for JSON output.
    pub fn type_name(&self) -> &'static str {
        match self {
            CliError::InvalidCapabilities { .. } => "invalid_capabilities",
            CliError::InvalidEffect { .. } => "invalid_effect",
            CliError::InvalidReport(_) => "invalid_report",
            CliError::Engine(_) => "engine",
            CliError::IoError(_) => "io",
            CliError::JsonError(_) => "json",
            CliError::YamlError(_) => "yaml",
        }
    }
}
