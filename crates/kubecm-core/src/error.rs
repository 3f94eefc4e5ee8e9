//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid deploy parameters: {message}")]
    InvalidParams { message: String },

    #[error("Invalid chart source '{source_ref}': {message}")]
    InvalidChartSource { source_ref: String, message: String },

    #[error("Invalid {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("Invalid hierarchy level '{template}': {message}")]
    InvalidLevel { template: String, message: String },

    #[error("Invalid data layer {path}: {message}")]
    InvalidLayer { path: PathBuf, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Values merge error: {message}")]
    ValuesMerge { message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
