//! The deploy pipeline
//!
//! lookup: hierarchy -> derived variables -> rendered data
//! render: lookup -> build directory -> chart -> command plan
//! deploy: render -> run the plan

use kubecm_core::{DeployContext, DeployParams, Hierarchy, ProjectConfig, Values};
use kubecm_engine::Engine;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::build::BuildDir;
use crate::command::{HelmCommand, plan_commands};
use crate::error::Result;
use crate::runner::CommandRunner;

/// Data of a release after template rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedRelease {
    pub vars: Values,
    pub resources: Values,
    pub values: Values,
    pub patches: Values,

    /// Data files that contributed, highest priority first
    #[serde(skip)]
    pub sources: Vec<PathBuf>,
}

impl RenderedRelease {
    /// All sections as one tree
    pub fn to_values(&self) -> Values {
        let mut tree = serde_json::Map::new();
        tree.insert("vars".to_string(), self.vars.inner().clone());
        tree.insert("resources".to_string(), self.resources.inner().clone());
        tree.insert("values".to_string(), self.values.inner().clone());
        tree.insert("patches".to_string(), self.patches.inner().clone());
        Values(JsonValue::Object(tree))
    }

    /// Look up a dotted key such as `values.image.tag`
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.to_values().get(key).cloned()
    }
}

/// A release whose build directory is written and whose commands are planned
#[derive(Debug, Clone)]
pub struct PreparedRelease {
    pub rendered: RenderedRelease,
    pub build_dir: BuildDir,
    pub chart_ref: String,
    pub commands: Vec<HelmCommand>,
    pub written: Vec<PathBuf>,
}

/// Runs the pipeline for a project
#[derive(Debug, Clone)]
pub struct Deployer {
    project_dir: PathBuf,
    config: ProjectConfig,
    engine: Engine,
}

impl Deployer {
    /// `project_dir` is the working directory of the pipeline: data,
    /// relative build directories and relative charts resolve against it
    pub fn new(project_dir: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        let engine = Engine::builder().strict(config.strict).build();
        Self {
            project_dir: project_dir.into(),
            config,
            engine,
        }
    }

    /// Deployer for the project in `project_dir`, reading its `kubecm.yaml`
    pub fn load(project_dir: &Path) -> Result<Self> {
        let project_dir = std::path::absolute(project_dir)?;
        let config = ProjectConfig::load(&project_dir)?;
        Ok(Self::new(project_dir, config))
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn hierarchy(&self) -> Hierarchy {
        Hierarchy::from_config(&self.config, &self.project_dir)
    }

    /// Merge and render the data of a release
    pub fn lookup(&self, params: &DeployParams) -> Result<RenderedRelease> {
        params.validate()?;

        let context = DeployContext::new(params);
        let hierarchy = self.hierarchy();
        let data = hierarchy.load(&self.engine, &context)?;
        if data.sources.is_empty() {
            warn!(
                release = %params.release,
                data_dir = %hierarchy.data_dir().display(),
                "no data files found for release"
            );
        }
        let context = self.engine.evaluate_vars(&data.vars, context)?;

        let resources = self
            .engine
            .render_data(data.resources.inner(), &context, "resources")?;
        let values = self.engine.render_data(data.values.inner(), &context, "values")?;
        let patches = self.engine.render_data(data.patches.inner(), &context, "patches")?;

        tracing::debug!(
            release = %params.release,
            sources = data.sources.len(),
            "rendered release data"
        );

        Ok(RenderedRelease {
            vars: Values(JsonValue::Object(context.vars)),
            resources: Values(resources),
            values: Values(values),
            patches: Values(patches),
            sources: data.sources,
        })
    }

    /// Write the build directory and plan the commands
    ///
    /// `extra_values` are merged over the rendered values as they are.
    pub fn render(&self, params: &DeployParams, extra_values: &Values) -> Result<PreparedRelease> {
        params.validate()?;
        let source = params.chart_source()?;

        let mut rendered = self.lookup(params)?;
        rendered.values.merge(extra_values);

        let build_dir = BuildDir::new(&params.build_dir, &self.project_dir);
        let written = build_dir.write(&rendered, &params.subchart_manifests, &self.config.tools)?;
        let chart_ref = build_dir.prepare_chart(&source, &params.chart)?;

        let commands = plan_commands(&self.config.tools.helm, params, &source, &chart_ref, &build_dir);

        info!(
            release = %params.release,
            build_dir = %build_dir.path().display(),
            "prepared release"
        );

        Ok(PreparedRelease {
            rendered,
            build_dir,
            chart_ref,
            commands,
            written,
        })
    }

    /// Render the release and run its commands, stopping at the first failure
    pub fn deploy<R: CommandRunner>(
        &self,
        params: &DeployParams,
        extra_values: &Values,
        runner: &mut R,
    ) -> Result<PreparedRelease> {
        let prepared = self.render(params, extra_values)?;

        for command in &prepared.commands {
            runner.run(command)?;
        }

        info!(release = %params.release, "deployed");
        Ok(prepared)
    }
}
