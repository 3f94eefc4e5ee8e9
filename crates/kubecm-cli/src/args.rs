//! Options shared by the release commands

use clap::Args;
use kubecm_core::{DeployParams, Values, parse_set_values};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Release name
    pub release: String,

    /// Project directory holding kubecm.yaml and the data directory
    #[arg(short = 'C', long, env = "KUBECM_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Chart name used for data lookup (defaults to the release name)
    #[arg(long)]
    pub chart: Option<String>,

    /// Chart location: oci:// reference, absolute or relative path, or
    /// <repo>/<chart> with --repo-url
    #[arg(long)]
    pub chart_source: Option<String>,

    /// URL of the chart repository to add before deploying
    #[arg(long, requires = "chart_source")]
    pub repo_url: Option<String>,

    /// Target namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Chart version
    #[arg(long)]
    pub chart_version: Option<String>,

    /// Parent release when deploying a subchart
    #[arg(long)]
    pub parent: Option<String>,

    /// Do not run chart hooks
    #[arg(long)]
    pub no_hooks: bool,

    /// Wait until the release is ready
    #[arg(long)]
    pub wait: bool,

    /// How long to wait with --wait
    #[arg(long, default_value = kubecm_core::params::DEFAULT_TIMEOUT)]
    pub timeout: String,

    /// Render with `helm template` into this file instead of deploying
    #[arg(long)]
    pub render_to: Option<PathBuf>,

    /// Release build directory, relative to the project directory
    #[arg(long, env = "KUBECM_BUILD_DIR", default_value = kubecm_core::params::DEFAULT_BUILD_DIR)]
    pub build_dir: PathBuf,

    /// Subchart manifest in the build directory to include (repeatable)
    #[arg(long = "subchart-manifest")]
    pub subchart_manifests: Vec<String>,

    /// Extra values file(s) merged over the data values
    #[arg(short = 'f', long = "values")]
    pub values: Vec<PathBuf>,

    /// Set values on command line (key=value)
    #[arg(long = "set")]
    pub set: Vec<String>,
}

impl ReleaseArgs {
    pub fn params(&self) -> DeployParams {
        let mut params = DeployParams::new(&self.release)
            .with_timeout(&self.timeout)
            .with_build_dir(&self.build_dir)
            .with_subchart_manifests(self.subchart_manifests.iter().cloned());

        if let Some(chart) = &self.chart {
            params = params.with_chart(chart);
        }
        if let Some(source) = &self.chart_source {
            params = params.with_chart_source(source);
        }
        if let Some(url) = &self.repo_url {
            params = params.with_repo_url(url);
        }
        if let Some(namespace) = &self.namespace {
            params = params.with_namespace(namespace);
        }
        if let Some(version) = &self.chart_version {
            params = params.with_version(version);
        }
        if let Some(parent) = &self.parent {
            params = params.with_parent(parent);
        }
        if self.no_hooks {
            params = params.without_hooks();
        }
        if self.wait {
            params = params.with_wait();
        }
        if let Some(path) = &self.render_to {
            params = params.with_render_to(path);
        }
        params
    }

    /// Values from -f files, then --set overrides
    ///
    /// Nulls are kept so they remove keys from the rendered values.
    pub fn extra_values(&self) -> kubecm_core::Result<Values> {
        let mut values = Values::new();
        for path in &self.values {
            values.stack(&Values::from_file(path)?);
            tracing::debug!(path = %path.display(), "merged values file");
        }
        if !self.set.is_empty() {
            values.stack(&parse_set_values(&self.set)?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        release: ReleaseArgs,
    }

    fn parse(args: &[&str]) -> ReleaseArgs {
        TestCli::parse_from(std::iter::once("kubecm").chain(args.iter().copied())).release
    }

    #[test]
    fn test_defaults() {
        let params = parse(&["myrelease"]).params();
        assert_eq!(params, DeployParams::new("myrelease"));
    }

    #[test]
    fn test_all_options() {
        let params = parse(&[
            "myrelease",
            "--chart",
            "myapp",
            "--chart-source",
            "fakerepo/fakechart",
            "--repo-url",
            "https://example.com/fakerepo",
            "-n",
            "test",
            "--chart-version",
            "1.2.3",
            "--no-hooks",
            "--wait",
            "--timeout",
            "5m",
            "--subchart-manifest",
            "sub.yaml",
            "--parent",
            "myparent",
        ])
        .params();

        assert_eq!(params.chart, "myapp");
        assert_eq!(params.chart_source.as_deref(), Some("fakerepo/fakechart"));
        assert_eq!(params.namespace.as_deref(), Some("test"));
        assert_eq!(params.version.as_deref(), Some("1.2.3"));
        assert!(!params.hooks);
        assert!(params.wait);
        assert_eq!(params.timeout, "5m");
        assert_eq!(params.subchart_manifests, vec!["sub.yaml"]);
        assert_eq!(params.parent.as_deref(), Some("myparent"));
    }

    #[test]
    fn test_repo_url_requires_source() {
        let result = TestCli::try_parse_from(["kubecm", "app", "--repo-url", "https://x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_set_overrides_values_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("extra.yaml");
        std::fs::write(&file, "image:\n  tag: a\n  pullPolicy: Always\n").unwrap();

        let args = parse(&["app", "-f", file.to_str().unwrap(), "--set", "image.tag=b"]);
        let values = args.extra_values().unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "b");
        assert_eq!(values.get("image.pullPolicy").unwrap(), "Always");
    }

    #[test]
    fn test_top_level_null_is_kept() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("extra.yaml");
        std::fs::write(&file, "ingress: null\n").unwrap();

        let args = parse(&[
            "app",
            "-f",
            file.to_str().unwrap(),
            "--set",
            "replicas=null",
            "--set",
            "image.tag=null",
        ]);
        let values = args.extra_values().unwrap();

        assert_eq!(
            values.inner(),
            &serde_json::json!({"ingress": null, "replicas": null, "image": {"tag": null}})
        );
    }
}
