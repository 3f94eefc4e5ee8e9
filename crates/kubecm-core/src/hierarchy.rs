//! Layered data files merged by priority
//!
//! A hierarchy is an ordered list of path templates, highest priority first.
//! Each template is rendered against the [`DeployContext`]; the resulting
//! files are read as [`DataLayer`]s and merged from the lowest priority up.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::config::ProjectConfig;
use crate::context::DeployContext;
use crate::error::{CoreError, Result};
use crate::values::Values;

/// Renders hierarchy path templates
pub trait LevelResolver {
    /// Render a level template, returning `None` when it references a
    /// variable the context does not define
    fn resolve_level(&self, template: &str, context: &DeployContext) -> Result<Option<String>>;
}

/// One data file of the hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataLayer {
    /// Derived variables, evaluated in order
    #[serde(default)]
    pub vars: Values,

    /// Kubernetes resources by name
    #[serde(default)]
    pub resources: Values,

    /// Helm values
    #[serde(default)]
    pub values: Values,

    /// Kustomize patches by name
    #[serde(default)]
    pub patches: Values,
}

impl DataLayer {
    /// Load a layer from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| CoreError::InvalidLayer {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse a layer; an empty document is an empty layer
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let layer: Option<Self> = serde_yaml::from_str(yaml)?;
        let layer = layer.unwrap_or_default().normalized();

        for (section, value) in layer.sections() {
            if !value.inner().is_object() {
                return Err(CoreError::ValuesMerge {
                    message: format!("'{}' must be a mapping", section),
                });
            }
        }
        Ok(layer)
    }

    fn sections(&self) -> [(&'static str, &Values); 4] {
        [
            ("vars", &self.vars),
            ("resources", &self.resources),
            ("values", &self.values),
            ("patches", &self.patches),
        ]
    }

    // `resources:` with no body parses as null
    fn normalized(mut self) -> Self {
        for section in [
            &mut self.vars,
            &mut self.resources,
            &mut self.values,
            &mut self.patches,
        ] {
            if section.inner().is_null() {
                *section = Values::new();
            }
        }
        self
    }
}

/// Merged data of all layers, before rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployData {
    pub vars: Values,
    pub resources: Values,
    pub values: Values,
    pub patches: Values,

    /// Files that contributed, highest priority first
    #[serde(skip)]
    pub sources: Vec<PathBuf>,
}

impl DeployData {
    fn merge_layer(&mut self, layer: &DataLayer) {
        self.vars.merge(&layer.vars);
        self.resources.merge(&layer.resources);
        self.values.merge(&layer.values);
        self.patches.merge(&layer.patches);
    }
}

/// A hierarchy level after path rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLevel {
    /// The configured path template
    pub template: String,

    /// File path, or `None` when the template referenced an undefined variable
    pub path: Option<PathBuf>,

    /// Whether the file exists
    pub exists: bool,
}

/// Ordered data layers under a data directory
#[derive(Debug, Clone)]
pub struct Hierarchy {
    data_dir: PathBuf,
    levels: Vec<String>,
}

impl Hierarchy {
    pub fn new(data_dir: impl Into<PathBuf>, levels: Vec<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            levels,
        }
    }

    /// Hierarchy configured for a project
    pub fn from_config(config: &ProjectConfig, project_dir: &Path) -> Self {
        Self::new(config.data_dir(project_dir), config.hierarchy.clone())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Render every level against the context
    pub fn resolve<R: LevelResolver>(
        &self,
        resolver: &R,
        context: &DeployContext,
    ) -> Result<Vec<ResolvedLevel>> {
        let mut resolved = Vec::with_capacity(self.levels.len());

        for template in &self.levels {
            let Some(relative) = resolver.resolve_level(template, context)? else {
                tracing::debug!(level = %template, "skipping level with undefined variable");
                resolved.push(ResolvedLevel {
                    template: template.clone(),
                    path: None,
                    exists: false,
                });
                continue;
            };

            let path = self.level_path(&relative)?;
            let exists = path.is_file();
            tracing::debug!(level = %template, path = %path.display(), exists, "resolved level");

            resolved.push(ResolvedLevel {
                template: template.clone(),
                path: Some(path),
                exists,
            });
        }

        Ok(resolved)
    }

    /// Load and merge every existing layer
    pub fn load<R: LevelResolver>(
        &self,
        resolver: &R,
        context: &DeployContext,
    ) -> Result<DeployData> {
        let levels = self.resolve(resolver, context)?;
        let mut data = DeployData::default();

        let existing: Vec<PathBuf> = levels
            .into_iter()
            .filter(|level| level.exists)
            .filter_map(|level| level.path)
            .collect();

        for path in existing.iter().rev() {
            let layer = DataLayer::from_file(path)?;
            data.merge_layer(&layer);
        }

        data.sources = existing;
        Ok(data)
    }

    // Rendered paths stay inside the data directory
    fn level_path(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if relative.trim().is_empty() || escapes {
            return Err(CoreError::InvalidLayer {
                path: rel.to_path_buf(),
                message: "level must be a relative path inside the data directory".to_string(),
            });
        }
        Ok(self.data_dir.join(rel))
    }
}
