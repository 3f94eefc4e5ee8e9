//! Release build directory
//!
//! Everything Helm and the post-renderer need is written here before any
//! command runs: the rendered resources, the Helm values, the kustomization
//! that stitches them together and the post-renderer script itself.

use kubecm_core::{ChartSource, ToolsConfig, Values};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::deploy::RenderedRelease;
use crate::error::{DeployError, Result};

pub const RESOURCES_FILE: &str = "resources.yaml";
pub const VALUES_FILE: &str = "values.yaml";
pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";
pub const POST_RENDERER_FILE: &str = "kustomize.sh";
/// Helm output saved by the post-renderer
pub const HELM_OUTPUT_FILE: &str = "helm.yaml";
pub const CHART_DIR: &str = "chart";

const KUSTOMIZE_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";

/// Paths of a release build directory
///
/// `dir` is kept as given because it appears verbatim in the Helm command
/// line; filesystem access goes through `base.join(dir)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDir {
    base: PathBuf,
    dir: PathBuf,
}

impl BuildDir {
    /// Build directory `dir`, relative paths resolved against `base`
    pub fn new(dir: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            dir: dir.into(),
        }
    }

    /// The directory as it appears in command arguments
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The directory on disk
    pub fn path(&self) -> PathBuf {
        self.base.join(&self.dir)
    }

    /// A file of the build directory as it appears in command arguments
    pub fn arg(&self, name: &str) -> String {
        self.dir.join(name).display().to_string()
    }

    /// A file of the build directory on disk
    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub fn chart_dir(&self) -> PathBuf {
        self.file(CHART_DIR)
    }

    /// Write the release artifacts, returning the written files
    pub fn write(
        &self,
        release: &RenderedRelease,
        subchart_manifests: &[String],
        tools: &ToolsConfig,
    ) -> Result<Vec<PathBuf>> {
        let root = self.path();
        fs::create_dir_all(&root).map_err(|e| DeployError::write(&root, e))?;

        let kustomization = Kustomization::new(subchart_manifests, &release.patches)?;
        let artifacts = [
            (RESOURCES_FILE, render_resources(release.resources.inner())?),
            (VALUES_FILE, release.values.to_yaml()?),
            (KUSTOMIZATION_FILE, kustomization.to_yaml()?),
            (POST_RENDERER_FILE, post_renderer_script(&tools.kustomize)),
        ];

        let mut written = Vec::with_capacity(artifacts.len());
        for (name, content) in artifacts {
            let path = root.join(name);
            fs::write(&path, content).map_err(|e| DeployError::write(&path, e))?;
            tracing::debug!(path = %path.display(), "wrote build file");
            written.push(path);
        }

        make_executable(&root.join(POST_RENDERER_FILE))?;
        Ok(written)
    }

    /// Put the chart in place and return the chart argument for Helm
    ///
    /// Empty and absolute sources end up in `<build_dir>/chart`, replacing
    /// whatever an earlier run left there. Other sources are referenced
    /// where they are.
    pub fn prepare_chart(&self, source: &ChartSource, chart: &str) -> Result<String> {
        match source {
            ChartSource::Empty => {
                let chart_dir = self.reset_chart_dir()?;
                write_empty_chart(&chart_dir, chart)?;
                Ok(chart_dir.display().to_string())
            }
            ChartSource::LocalAbsolute(src) => {
                if !src.join("Chart.yaml").is_file() {
                    return Err(DeployError::ChartNotFound { path: src.clone() });
                }
                if overlaps(src, &self.chart_dir()) {
                    return Err(DeployError::ChartInBuildDir {
                        path: src.clone(),
                        chart_dir: self.chart_dir(),
                    });
                }
                let chart_dir = self.reset_chart_dir()?;
                copy_dir(src, &chart_dir)?;
                Ok(chart_dir.display().to_string())
            }
            ChartSource::Oci(reference) => Ok(reference.clone()),
            ChartSource::Repository { repo, chart, .. } => Ok(format!("{}/{}", repo, chart)),
            ChartSource::LocalRelative(path) => Ok(relative_chart_ref(path)),
        }
    }

    fn reset_chart_dir(&self) -> Result<PathBuf> {
        let chart_dir = self.chart_dir();
        if chart_dir.exists() {
            fs::remove_dir_all(&chart_dir).map_err(|e| DeployError::write(&chart_dir, e))?;
        }
        fs::create_dir_all(&chart_dir).map_err(|e| DeployError::write(&chart_dir, e))?;
        Ok(chart_dir)
    }
}

// Either directory inside the other: resetting `chart_dir` would delete the
// source, or copying would recurse into its own output
fn overlaps(src: &Path, chart_dir: &Path) -> bool {
    let src = resolve(src);
    let chart_dir = resolve(chart_dir);
    src.starts_with(&chart_dir) || chart_dir.starts_with(&src)
}

// Canonical form of the deepest existing ancestor, rest appended as is
fn resolve(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if let Ok(resolved) = fs::canonicalize(ancestor) {
            let rest = path.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return resolved.join(rest);
        }
    }
    path.to_path_buf()
}

/// Chart argument for a path relative to the working directory
pub fn relative_chart_ref(path: &str) -> String {
    if path.starts_with("./") || path.starts_with("../") {
        path.to_string()
    } else {
        format!("./{}", path)
    }
}

/// Render resources as a stream of YAML documents
///
/// Each resource is one document introduced by `---`, in merged order.
/// Null resources are dropped so a higher layer can remove one.
pub fn render_resources(resources: &JsonValue) -> Result<String> {
    let Some(resources) = resources.as_object() else {
        return Ok(String::new());
    };

    let mut out = String::new();
    for (name, resource) in resources {
        if resource.is_null() {
            continue;
        }
        check_resource(name, resource)?;
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(resource)?);
    }
    Ok(out)
}

fn check_resource(name: &str, resource: &JsonValue) -> Result<()> {
    let Some(object) = resource.as_object() else {
        return Err(DeployError::InvalidResource {
            name: name.to_string(),
            message: "expected a mapping".to_string(),
        });
    };

    for field in ["apiVersion", "kind"] {
        let present = object
            .get(field)
            .and_then(JsonValue::as_str)
            .is_some_and(|v| !v.is_empty());
        if !present {
            return Err(DeployError::InvalidResource {
                name: name.to_string(),
                message: format!("missing `{}`", field),
            });
        }
    }
    Ok(())
}

/// `kustomization.yaml` of a release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    pub api_version: String,
    pub kind: String,
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<JsonValue>,
}

impl Kustomization {
    /// Subchart manifests first, then the release resources, then the
    /// Helm output
    pub fn new(subchart_manifests: &[String], patches: &Values) -> Result<Self> {
        let mut resources: Vec<String> = subchart_manifests.to_vec();
        resources.push(RESOURCES_FILE.to_string());
        resources.push(HELM_OUTPUT_FILE.to_string());

        let mut entries = Vec::new();
        if let Some(patches) = patches.inner().as_object() {
            for (name, patch) in patches {
                if patch.is_null() {
                    continue;
                }
                if !patch.is_object() {
                    return Err(DeployError::InvalidPatch {
                        name: name.clone(),
                        message: "expected a mapping such as `{patch: ..., target: ...}`"
                            .to_string(),
                    });
                }
                entries.push(patch.clone());
            }
        }

        Ok(Self {
            api_version: KUSTOMIZE_API_VERSION.to_string(),
            kind: "Kustomization".to_string(),
            resources,
            patches: entries,
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Post-renderer script: saves Helm's output next to the kustomization and
/// prints the kustomized result
pub fn post_renderer_script(kustomize: &str) -> String {
    format!(
        "#!/bin/sh\nset -e\ncat > \"$1/{}\"\nexec {} \"$1\"\n",
        HELM_OUTPUT_FILE, kustomize
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartMetadata<'a> {
    api_version: &'a str,
    name: &'a str,
    version: &'a str,
    description: &'a str,
}

fn write_empty_chart(chart_dir: &Path, chart: &str) -> Result<()> {
    let metadata = ChartMetadata {
        api_version: "v2",
        name: chart,
        version: "0.1.0",
        description: "Empty chart generated by kubecm",
    };

    let path = chart_dir.join("Chart.yaml");
    fs::write(&path, serde_yaml::to_string(&metadata)?).map_err(|e| DeployError::write(&path, e))?;

    let templates = chart_dir.join("templates");
    fs::create_dir_all(&templates).map_err(|e| DeployError::write(&templates, e))?;
    Ok(())
}

fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            DeployError::write(path, std::io::Error::other(e.to_string()))
        })?;
        let rel_path = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| DeployError::write(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| DeployError::write(&target, e))?;
        }
    }
    Ok(())
}

fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .map_err(|e| DeployError::write(path, e))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).map_err(|e| DeployError::write(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn release(resources: JsonValue, patches: JsonValue) -> RenderedRelease {
        RenderedRelease {
            vars: Values::new(),
            resources: Values(resources),
            values: Values(json!({"replicaCount": 2})),
            patches: Values(patches),
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_paths() {
        let build = BuildDir::new("build", "/fakedir");
        assert_eq!(build.arg(POST_RENDERER_FILE), "build/kustomize.sh");
        assert_eq!(build.chart_dir(), PathBuf::from("/fakedir/build/chart"));

        let build = BuildDir::new("/mybuilddir", "/fakedir");
        assert_eq!(build.arg(VALUES_FILE), "/mybuilddir/values.yaml");
        assert_eq!(build.path(), PathBuf::from("/mybuilddir"));
    }

    #[test]
    fn test_render_resources_documents() {
        let out = render_resources(&json!({
            "config": {
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "app-config"}
            },
            "removed": null,
            "service": {
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": {"name": "app"}
            }
        }))
        .unwrap();

        insta::assert_snapshot!(out, @r"
        ---
        apiVersion: v1
        kind: ConfigMap
        metadata:
          name: app-config
        ---
        apiVersion: v1
        kind: Service
        metadata:
          name: app
        ");
    }

    #[test]
    fn test_render_resources_requires_kind() {
        let err = render_resources(&json!({"broken": {"apiVersion": "v1"}})).unwrap_err();
        match err {
            DeployError::InvalidResource { name, message } => {
                assert_eq!(name, "broken");
                assert!(message.contains("kind"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_resources_rejects_scalar() {
        let err = render_resources(&json!({"broken": "text"})).unwrap_err();
        assert!(matches!(err, DeployError::InvalidResource { .. }));
    }

    #[test]
    fn test_render_resources_empty() {
        assert_eq!(render_resources(&json!({})).unwrap(), "");
    }

    #[test]
    fn test_kustomization_without_subcharts() {
        let kustomization = Kustomization::new(&[], &Values::new()).unwrap();

        insta::assert_snapshot!(kustomization.to_yaml().unwrap(), @r"
        apiVersion: kustomize.config.k8s.io/v1beta1
        kind: Kustomization
        resources:
        - resources.yaml
        - helm.yaml
        ");
    }

    #[test]
    fn test_kustomization_with_subcharts() {
        let subcharts = vec!["subchart1.yaml".to_string(), "subchart2.yaml".to_string()];
        let kustomization = Kustomization::new(&subcharts, &Values::new()).unwrap();

        assert_eq!(
            kustomization.resources,
            vec!["subchart1.yaml", "subchart2.yaml", "resources.yaml", "helm.yaml"]
        );
    }

    #[test]
    fn test_kustomization_patches() {
        let patches = Values(json!({
            "replicas": {
                "target": {"kind": "Deployment"},
                "patch": "- op: replace\n  path: /spec/replicas\n  value: 1\n"
            },
            "dropped": null
        }));
        let kustomization = Kustomization::new(&[], &patches).unwrap();

        assert_eq!(kustomization.patches.len(), 1);
        assert_eq!(kustomization.patches[0]["target"]["kind"], "Deployment");
        assert!(kustomization.to_yaml().unwrap().contains("patches:"));
    }

    #[test]
    fn test_kustomization_rejects_scalar_patch() {
        let err = Kustomization::new(&[], &Values(json!({"bad": "x"}))).unwrap_err();
        assert!(matches!(err, DeployError::InvalidPatch { .. }));
    }

    #[test]
    fn test_post_renderer_script() {
        insta::assert_snapshot!(post_renderer_script("kustomize build"), @r#"
        #!/bin/sh
        set -e
        cat > "$1/helm.yaml"
        exec kustomize build "$1"
        "#);
    }

    #[test]
    fn test_write() {
        let temp = TempDir::new().unwrap();
        let build = BuildDir::new("build", temp.path());
        let release = release(
            json!({"config": {"apiVersion": "v1", "kind": "ConfigMap"}}),
            json!({}),
        );

        let written = build.write(&release, &[], &ToolsConfig::default()).unwrap();

        assert_eq!(written.len(), 4);
        let root = temp.path().join("build");
        assert_eq!(
            fs::read_to_string(root.join(RESOURCES_FILE)).unwrap(),
            "---\napiVersion: v1\nkind: ConfigMap\n"
        );
        assert_eq!(
            fs::read_to_string(root.join(VALUES_FILE)).unwrap(),
            "replicaCount: 2\n"
        );
        assert!(root.join(KUSTOMIZATION_FILE).is_file());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(root.join(POST_RENDERER_FILE))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_write_empty_values() {
        let temp = TempDir::new().unwrap();
        let build = BuildDir::new("build", temp.path());
        let mut release = release(json!({}), json!({}));
        release.values = Values::new();

        build.write(&release, &[], &ToolsConfig::default()).unwrap();

        assert_eq!(
            fs::read_to_string(temp.path().join("build").join(VALUES_FILE)).unwrap(),
            "{}\n"
        );
    }

    #[test]
    fn test_prepare_empty_chart() {
        let temp = TempDir::new().unwrap();
        let build = BuildDir::new("build", temp.path());

        let chart_ref = build.prepare_chart(&ChartSource::Empty, "myapp").unwrap();

        let chart_dir = temp.path().join("build").join("chart");
        assert_eq!(chart_ref, chart_dir.display().to_string());
        let metadata = fs::read_to_string(chart_dir.join("Chart.yaml")).unwrap();
        assert!(metadata.contains("apiVersion: v2"));
        assert!(metadata.contains("name: myapp"));
        assert!(chart_dir.join("templates").is_dir());
    }

    #[test]
    fn test_prepare_absolute_chart_copies() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("charts").join("web");
        fs::create_dir_all(src.join("templates")).unwrap();
        fs::write(src.join("Chart.yaml"), "apiVersion: v2\nname: web\nversion: 1.0.0\n").unwrap();
        fs::write(src.join("templates").join("svc.yaml"), "kind: Service\n").unwrap();

        let build = BuildDir::new("build", temp.path());
        // Stale output of an earlier run
        fs::create_dir_all(build.chart_dir().join("templates")).unwrap();
        fs::write(build.chart_dir().join("templates").join("old.yaml"), "x").unwrap();

        let chart_ref = build
            .prepare_chart(&ChartSource::LocalAbsolute(src.clone()), "web")
            .unwrap();

        assert_eq!(chart_ref, build.chart_dir().display().to_string());
        assert!(build.chart_dir().join("templates").join("svc.yaml").is_file());
        assert!(!build.chart_dir().join("templates").join("old.yaml").exists());
    }

    #[test]
    fn test_prepare_absolute_chart_missing() {
        let temp = TempDir::new().unwrap();
        let build = BuildDir::new("build", temp.path());
        let err = build
            .prepare_chart(&ChartSource::LocalAbsolute(temp.path().join("nope")), "x")
            .unwrap_err();
        assert!(matches!(err, DeployError::ChartNotFound { .. }));
    }

    #[test]
    fn test_prepare_absolute_chart_in_build_dir() {
        let temp = TempDir::new().unwrap();
        let build = BuildDir::new("build", temp.path());
        fs::create_dir_all(build.chart_dir()).unwrap();
        fs::write(build.chart_dir().join("Chart.yaml"), "apiVersion: v2\nname: web\n").unwrap();

        let err = build
            .prepare_chart(&ChartSource::LocalAbsolute(build.chart_dir()), "web")
            .unwrap_err();

        assert!(matches!(err, DeployError::ChartInBuildDir { .. }));
        assert!(build.chart_dir().join("Chart.yaml").is_file());
    }

    #[test]
    fn test_prepare_absolute_chart_containing_build_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Chart.yaml"), "apiVersion: v2\nname: web\n").unwrap();
        let build = BuildDir::new("build", temp.path());

        let err = build
            .prepare_chart(&ChartSource::LocalAbsolute(temp.path().to_path_buf()), "web")
            .unwrap_err();

        assert!(matches!(err, DeployError::ChartInBuildDir { .. }));
        assert!(!build.chart_dir().exists());
    }

    #[test]
    fn test_prepare_referenced_charts() {
        let build = BuildDir::new("build", "/fakedir");

        let oci = ChartSource::Oci("oci://example.com/charts/app".into());
        assert_eq!(build.prepare_chart(&oci, "app").unwrap(), "oci://example.com/charts/app");

        let repo = ChartSource::Repository {
            repo: "fakerepo".into(),
            chart: "fakechart".into(),
            url: "https://example.com/fakerepo".into(),
        };
        assert_eq!(build.prepare_chart(&repo, "app").unwrap(), "fakerepo/fakechart");

        let relative = ChartSource::LocalRelative("mychart".into());
        assert_eq!(build.prepare_chart(&relative, "app").unwrap(), "./mychart");
    }

    #[test]
    fn test_relative_chart_ref() {
        assert_eq!(relative_chart_ref("mychart"), "./mychart");
        assert_eq!(relative_chart_ref("./mychart"), "./mychart");
        assert_eq!(relative_chart_ref("../charts/app"), "../charts/app");
    }
}
