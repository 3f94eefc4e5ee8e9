//! Template scope for data rendering

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::params::DeployParams;

/// Variables available to hierarchy paths and data templates
///
/// Absent options are left out of the serialized scope, so a template that
/// references them sees an undefined variable rather than `none`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployContext {
    pub release: String,

    pub chart: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_source: Option<String>,

    /// Derived variables, evaluated from the data layers
    #[serde(default)]
    pub vars: serde_json::Map<String, JsonValue>,
}

impl DeployContext {
    /// Create a context for the given parameters with no derived variables
    pub fn new(params: &DeployParams) -> Self {
        Self {
            release: params.release.clone(),
            chart: params.chart.clone(),
            namespace: params.namespace.clone(),
            version: params.version.clone(),
            parent: params.parent.clone(),
            chart_source: params.chart_source.clone(),
            vars: serde_json::Map::new(),
        }
    }

    /// Replace the derived variables
    pub fn with_vars(mut self, vars: serde_json::Map<String, JsonValue>) -> Self {
        self.vars = vars;
        self
    }

    /// Convert to minijinja-compatible context
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}
