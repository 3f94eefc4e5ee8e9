//! kubecm Engine - Jinja2 templating for layered Kubernetes data
//!
//! This crate provides a MiniJinja-based engine with:
//! - Kubernetes-specific filters (toyaml, b64encode, etc.)
//! - Rendering of every string in a data tree
//! - Ordered evaluation of derived variables
//! - Human-readable error messages with suggestions

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod suggestions;

pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
pub use suggestions::{AVAILABLE_FILTERS, AVAILABLE_FUNCTIONS};
