//! kubecm Deploy - build directory generation and Helm invocation
//!
//! This crate turns layered data into a deployable release:
//! - `BuildDir`: writes resources, values, kustomization and post-renderer
//! - `HelmCommand`: assembles the exact Helm command lines
//! - `CommandRunner`: executes (or records) those commands
//! - `Deployer`: the full lookup, render and deploy pipeline

pub mod build;
pub mod command;
pub mod deploy;
pub mod error;
pub mod runner;

pub use build::{BuildDir, Kustomization, render_resources};
pub use command::{HelmCommand, plan_commands};
pub use deploy::{Deployer, PreparedRelease, RenderedRelease};
pub use error::{DeployError, Result};
pub use runner::{CommandRunner, ProcessRunner, RecordingRunner};
