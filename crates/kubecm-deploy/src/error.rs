//! Deploy error types

use kubecm_core::CoreError;
use kubecm_engine::EngineError;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DeployError {
    #[error(transparent)]
    #[diagnostic(code(kubecm::deploy::data))]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(code(kubecm::deploy::template))]
    Engine(#[from] EngineError),

    #[error("Invalid resource '{name}': {message}")]
    #[diagnostic(
        code(kubecm::deploy::resource),
        help("resources are keyed by name and must be complete Kubernetes objects")
    )]
    InvalidResource { name: String, message: String },

    #[error("Invalid patch '{name}': {message}")]
    #[diagnostic(code(kubecm::deploy::patch))]
    InvalidPatch { name: String, message: String },

    #[error("Chart directory not found: {path}")]
    #[diagnostic(code(kubecm::deploy::chart))]
    ChartNotFound { path: PathBuf },

    #[error("Chart directory {path} overlaps the build chart directory {chart_dir}")]
    #[diagnostic(
        code(kubecm::deploy::chart),
        help("absolute charts are copied into the build directory; keep them outside of it")
    )]
    ChartInBuildDir { path: PathBuf, chart_dir: PathBuf },

    #[error("Failed to write {path}: {source}")]
    #[diagnostic(code(kubecm::deploy::io))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    #[diagnostic(code(kubecm::deploy::io))]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize YAML: {0}")]
    #[diagnostic(code(kubecm::deploy::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to run `{program}`: {source}")]
    #[diagnostic(
        code(kubecm::deploy::spawn),
        help("check that the tool is installed and on PATH, or set `tools` in kubecm.yaml")
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed ({}): {command}", exit_status(.code))]
    #[diagnostic(code(kubecm::deploy::command))]
    CommandFailed { command: String, code: Option<i32> },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl DeployError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
