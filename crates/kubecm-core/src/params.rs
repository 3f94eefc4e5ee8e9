//! Deploy parameters and chart source classification

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Default build directory, relative to the working directory
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Default `--timeout` passed along with `--wait`
pub const DEFAULT_TIMEOUT: &str = "1h";

const OCI_SCHEME: &str = "oci://";

/// Parameters of a single deploy invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployParams {
    /// Helm release name
    pub release: String,

    /// Chart name, used for data lookup and for the generated empty chart
    pub chart: String,

    /// Where the chart comes from (see [`ChartSource`])
    pub chart_source: Option<String>,

    /// Repository URL for `<repo>/<chart>` sources
    pub repo_url: Option<String>,

    /// Target namespace
    pub namespace: Option<String>,

    /// Chart version
    pub version: Option<String>,

    /// Parent release when this release is rendered as a subchart
    pub parent: Option<String>,

    /// Run chart hooks
    pub hooks: bool,

    /// Wait for the release to become ready
    pub wait: bool,

    /// Helm duration used with `wait`
    pub timeout: String,

    /// Render with `helm template` into this file instead of deploying
    pub render_to: Option<PathBuf>,

    /// Release build directory
    pub build_dir: PathBuf,

    /// Manifests (relative to the build directory) rendered from subcharts
    pub subchart_manifests: Vec<String>,
}

impl DeployParams {
    /// Create parameters for a release with every option at its default
    pub fn new(release: impl Into<String>) -> Self {
        let release = release.into();
        Self {
            chart: release.clone(),
            release,
            chart_source: None,
            repo_url: None,
            namespace: None,
            version: None,
            parent: None,
            hooks: true,
            wait: false,
            timeout: DEFAULT_TIMEOUT.to_string(),
            render_to: None,
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            subchart_manifests: Vec::new(),
        }
    }

    pub fn with_chart(mut self, chart: impl Into<String>) -> Self {
        self.chart = chart.into();
        self
    }

    pub fn with_chart_source(mut self, source: impl Into<String>) -> Self {
        self.chart_source = non_blank(source.into());
        self
    }

    pub fn with_repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = non_blank(url.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = non_blank(namespace.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = non_blank(version.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = non_blank(parent.into());
        self
    }

    /// Skip chart hooks (`--no-hooks`)
    pub fn without_hooks(mut self) -> Self {
        self.hooks = false;
        self
    }

    /// Wait for the release (`--wait --timeout <timeout>`)
    pub fn with_wait(mut self) -> Self {
        self.wait = true;
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn with_render_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.render_to = Some(path.into());
        self
    }

    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = dir.into();
        self
    }

    pub fn with_subchart_manifests<I, S>(mut self, manifests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subchart_manifests = manifests.into_iter().map(Into::into).collect();
        self
    }

    /// Check required fields and option combinations
    pub fn validate(&self) -> Result<()> {
        if self.release.trim().is_empty() {
            return Err(invalid("release name must not be empty"));
        }
        if self.chart.trim().is_empty() {
            return Err(invalid("chart name must not be empty"));
        }
        if self.timeout.trim().is_empty() {
            return Err(invalid("timeout must not be empty"));
        }
        if self.repo_url.is_some() && self.chart_source.is_none() {
            return Err(invalid("a repository URL requires a chart source"));
        }
        if self.build_dir.as_os_str().is_empty() {
            return Err(invalid("build directory must not be empty"));
        }
        if let Some(manifest) = self.subchart_manifests.iter().find(|m| m.trim().is_empty()) {
            return Err(invalid(format!("invalid subchart manifest '{}'", manifest)));
        }
        Ok(())
    }

    /// Classify the chart source
    pub fn chart_source(&self) -> Result<ChartSource> {
        ChartSource::classify(self.chart_source.as_deref(), self.repo_url.as_deref())
    }

    /// Whether the chart is rendered to a file rather than deployed
    pub fn is_render_only(&self) -> bool {
        self.render_to.is_some()
    }
}

/// Where the chart for a release comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    /// No chart: an empty chart is generated in the build directory
    Empty,

    /// OCI registry reference, passed through as is
    Oci(String),

    /// Chart directory on the local filesystem, copied into the build directory
    LocalAbsolute(PathBuf),

    /// `<repo>/<chart>` from a repository that is added before deploying
    Repository {
        repo: String,
        chart: String,
        url: String,
    },

    /// Chart directory relative to the working directory
    LocalRelative(String),
}

impl ChartSource {
    /// Classify a chart source string
    ///
    /// Checked in order: absent, `oci://`, absolute path, repository
    /// (requires `repo_url`), relative path.
    pub fn classify(source: Option<&str>, repo_url: Option<&str>) -> Result<Self> {
        let Some(source) = source.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::Empty);
        };

        if source.starts_with(OCI_SCHEME) {
            return Ok(Self::Oci(source.to_string()));
        }

        if Path::new(source).is_absolute() {
            return Ok(Self::LocalAbsolute(PathBuf::from(source)));
        }

        if let Some(url) = repo_url {
            let (repo, chart) = source
                .split_once('/')
                .filter(|(repo, chart)| !repo.is_empty() && !chart.is_empty())
                .ok_or_else(|| CoreError::InvalidChartSource {
                    source_ref: source.to_string(),
                    message: "expected <repo>/<chart> when a repository URL is given".to_string(),
                })?;
            return Ok(Self::Repository {
                repo: repo.to_string(),
                chart: chart.to_string(),
                url: url.to_string(),
            });
        }

        Ok(Self::LocalRelative(source.to_string()))
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::InvalidParams {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = DeployParams::new("myrelease");

        assert_eq!(params.chart, "myrelease");
        assert!(params.hooks);
        assert!(!params.wait);
        assert_eq!(params.timeout, "1h");
        assert_eq!(params.build_dir, PathBuf::from("build"));
        assert!(params.subchart_manifests.is_empty());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_blank_options_are_absent() {
        let params = DeployParams::new("app").with_namespace("  ").with_version("");

        assert!(params.namespace.is_none());
        assert!(params.version.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_release() {
        let err = DeployParams::new("").validate().unwrap_err();
        assert!(err.to_string().contains("release name"));
    }

    #[test]
    fn test_validate_repo_url_requires_source() {
        let params = DeployParams::new("app").with_repo_url("https://example.com/charts");
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("requires a chart source"));
    }

    #[test]
    fn test_classify_empty() {
        assert_eq!(ChartSource::classify(None, None).unwrap(), ChartSource::Empty);
        assert_eq!(ChartSource::classify(Some(""), None).unwrap(), ChartSource::Empty);
    }

    #[test]
    fn test_classify_oci() {
        let source = ChartSource::classify(Some("oci://example.com/repo/chart"), None).unwrap();
        assert_eq!(source, ChartSource::Oci("oci://example.com/repo/chart".into()));
    }

    #[test]
    fn test_classify_oci_ignores_repo_url() {
        let source =
            ChartSource::classify(Some("oci://example.com/chart"), Some("https://x")).unwrap();
        assert!(matches!(source, ChartSource::Oci(_)));
    }

    #[test]
    fn test_classify_absolute() {
        let source = ChartSource::classify(Some("/mychart"), None).unwrap();
        assert_eq!(source, ChartSource::LocalAbsolute(PathBuf::from("/mychart")));
    }

    #[test]
    fn test_classify_repository() {
        let source = ChartSource::classify(
            Some("fakerepo/fakechart"),
            Some("https://example.com/fakerepo"),
        )
        .unwrap();

        assert_eq!(
            source,
            ChartSource::Repository {
                repo: "fakerepo".into(),
                chart: "fakechart".into(),
                url: "https://example.com/fakerepo".into(),
            }
        );
    }

    #[test]
    fn test_classify_repository_without_slash() {
        let err = ChartSource::classify(Some("fakechart"), Some("https://example.com")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidChartSource { .. }));
    }

    #[test]
    fn test_classify_relative() {
        let source = ChartSource::classify(Some("mychart"), None).unwrap();
        assert_eq!(source, ChartSource::LocalRelative("mychart".into()));
    }
}
