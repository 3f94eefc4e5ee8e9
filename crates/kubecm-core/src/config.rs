//! Project configuration (`kubecm.yaml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "kubecm.yaml";

/// Project-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory holding the data layers, relative to the project directory
    #[serde(default = "default_datadir")]
    pub datadir: PathBuf,

    /// Data layer path templates, highest priority first
    #[serde(default = "default_hierarchy")]
    pub hierarchy: Vec<String>,

    /// Fail on undefined variables in data templates; when off they
    /// render as empty strings
    #[serde(default = "default_strict")]
    pub strict: bool,

    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            datadir: default_datadir(),
            hierarchy: default_hierarchy(),
            strict: default_strict(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Commands used to invoke the external tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Helm executable
    #[serde(default = "default_helm")]
    pub helm: String,

    /// Command the post-renderer runs on the build directory
    #[serde(default = "default_kustomize")]
    pub kustomize: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            helm: default_helm(),
            kustomize: default_kustomize(),
        }
    }
}

fn default_datadir() -> PathBuf {
    PathBuf::from("data")
}

fn default_hierarchy() -> Vec<String> {
    vec![
        "releases/{{ release }}.yaml".to_string(),
        "namespaces/{{ namespace }}.yaml".to_string(),
        "charts/{{ chart }}.yaml".to_string(),
        "common.yaml".to_string(),
    ]
}

fn default_strict() -> bool {
    true
}

fn default_helm() -> String {
    "helm".to_string()
}

fn default_kustomize() -> String {
    "kustomize build".to_string()
}

impl ProjectConfig {
    /// Load `kubecm.yaml` from a project directory, falling back to defaults
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no project config, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: &str| CoreError::InvalidConfig {
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        if self.hierarchy.iter().any(|level| level.trim().is_empty()) {
            return Err(invalid("hierarchy levels must not be empty"));
        }
        if self.tools.helm.trim().is_empty() {
            return Err(invalid("tools.helm must not be empty"));
        }
        if self.tools.kustomize.trim().is_empty() {
            return Err(invalid("tools.kustomize must not be empty"));
        }
        Ok(())
    }

    /// Absolute data directory for a project
    pub fn data_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.datadir)
    }
}
