//! kubecm Core - Core types for layered Kubernetes configuration
//!
//! This crate provides the foundational types used throughout kubecm:
//! - `DeployParams`: The parameters of a single deploy invocation
//! - `ChartSource`: Where the chart for a release comes from
//! - `Values`: Configuration values with deep merge support
//! - `ProjectConfig`: The `kubecm.yaml` project configuration
//! - `Hierarchy`: Layered data files merged by priority

pub mod config;
pub mod context;
pub mod error;
pub mod hierarchy;
pub mod params;
pub mod values;

pub use config::{ProjectConfig, ToolsConfig, CONFIG_FILE};
pub use context::DeployContext;
pub use error::{CoreError, Result};
pub use hierarchy::{DataLayer, DeployData, Hierarchy, LevelResolver, ResolvedLevel};
pub use params::{ChartSource, DeployParams};
pub use values::{Values, parse_set_values};
