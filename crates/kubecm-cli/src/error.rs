//! CLI error types with exit code handling
//!
//! Library errors are folded into a few classes, each with its own exit code.

use kubecm_core::CoreError;
use kubecm_deploy::DeployError;
use kubecm_engine::{EngineError, TemplateError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid release options or arguments
    #[error("Validation failed: {message}")]
    #[diagnostic(code(kubecm::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Data template rendering failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    /// Invalid project configuration or data
    #[error("Data error: {message}")]
    #[diagnostic(code(kubecm::cli::data))]
    Data {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(kubecm::cli::io))]
    Io { message: String },

    /// An external tool exited with a failure
    #[error("`{command}` exited with code {code}")]
    #[diagnostic(code(kubecm::cli::tool))]
    Tool { command: String, code: i32 },

    #[error("{message}")]
    #[diagnostic(code(kubecm::cli::error))]
    Other {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Template(_) => exit_codes::TEMPLATE_ERROR,
            CliError::Data { .. } => exit_codes::DATA_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Tool { code, .. } => *code,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
            help: None,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidParams { .. } => CliError::validation(err.to_string()),
            CoreError::InvalidChartSource { .. } => CliError::validation_with_help(
                err.to_string(),
                "use --chart-source <repo>/<chart> together with --repo-url",
            ),
            CoreError::Io(e) => e.into(),
            CoreError::InvalidLayer { .. } => CliError::Data {
                message: err.to_string(),
                help: Some(
                    "data layers may only contain `vars`, `resources`, `values` and `patches`"
                        .to_string(),
                ),
            },
            other => CliError::data(other.to_string()),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Template(te) => CliError::Template(te),
            other => CliError::data(other.to_string()),
        }
    }
}

impl From<DeployError> for CliError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::Core(e) => e.into(),
            DeployError::Engine(e) => e.into(),
            DeployError::InvalidResource { .. } | DeployError::InvalidPatch { .. } => {
                CliError::data(err.to_string())
            }
            DeployError::ChartNotFound { .. } => CliError::validation_with_help(
                err.to_string(),
                "an absolute --chart-source must be a chart directory containing Chart.yaml",
            ),
            DeployError::ChartInBuildDir { .. } => CliError::validation(err.to_string()),
            DeployError::Write { .. } | DeployError::Io(_) => CliError::Io {
                message: err.to_string(),
            },
            DeployError::Spawn { .. } => CliError::Other {
                message: err.to_string(),
                help: Some("set `tools.helm` in kubecm.yaml if helm is not on PATH".to_string()),
            },
            DeployError::CommandFailed { command, code } => CliError::Tool {
                command,
                code: code.unwrap_or(exit_codes::ERROR),
            },
            other => CliError::other(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::other(format!("Failed to serialize YAML: {}", err))
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
