//! Helm command lines

use kubecm_core::{ChartSource, DeployParams};
use std::fmt;
use std::path::PathBuf;

use crate::build::{BuildDir, POST_RENDERER_FILE, VALUES_FILE};

/// An external command, run without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmCommand {
    pub program: String,
    pub args: Vec<String>,

    /// File receiving stdout, relative to the working directory
    pub stdout: Option<PathBuf>,
}

impl HelmCommand {
    /// Start a command from a configured tool such as `helm` or
    /// `/opt/helm/bin/helm --kube-context prod`
    pub fn new(tool: &str) -> Self {
        let mut words = tool.split_whitespace().map(String::from);
        Self {
            program: words.next().unwrap_or_else(|| "helm".to_string()),
            args: words.collect(),
            stdout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// `helm repo add <repo> <url>`
    pub fn repo_add(helm: &str, repo: &str, url: &str) -> Self {
        Self::new(helm).args(["repo", "add", repo, url])
    }

    /// `helm upgrade --install` for the release, or `helm template` when
    /// rendering to a file
    pub fn deploy(helm: &str, params: &DeployParams, chart_ref: &str, build: &BuildDir) -> Self {
        let mut cmd = Self::new(helm);

        cmd = if params.is_render_only() {
            cmd.arg("template")
        } else {
            cmd.args(["upgrade", "--install"])
        };
        cmd = cmd.args([params.release.as_str(), chart_ref]);

        if !params.hooks {
            cmd = cmd.arg("--no-hooks");
        }
        if let Some(namespace) = &params.namespace {
            cmd = cmd.args(["--create-namespace", "--namespace", namespace.as_str()]);
        }

        cmd = cmd
            .arg("--post-renderer")
            .arg(build.arg(POST_RENDERER_FILE))
            .arg("--post-renderer-args")
            .arg(build.dir().display().to_string())
            .arg("--values")
            .arg(build.arg(VALUES_FILE));

        if let Some(version) = &params.version {
            cmd = cmd.args(["--version", version.as_str()]);
        }
        if params.wait {
            cmd = cmd.args(["--wait", "--timeout", params.timeout.as_str()]);
        }
        if let Some(path) = &params.render_to {
            cmd = cmd.stdout_to(path);
        }

        cmd
    }
}

impl fmt::Display for HelmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(path) = &self.stdout {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

/// Commands to run for a release, in order
pub fn plan_commands(
    helm: &str,
    params: &DeployParams,
    source: &ChartSource,
    chart_ref: &str,
    build: &BuildDir,
) -> Vec<HelmCommand> {
    let mut commands = Vec::with_capacity(2);

    if let ChartSource::Repository { repo, url, .. } = source {
        commands.push(HelmCommand::repo_add(helm, repo, url));
    }
    commands.push(HelmCommand::deploy(helm, params, chart_ref, build));

    tracing::debug!(
        commands = ?commands.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "planned commands"
    );
    commands
}
