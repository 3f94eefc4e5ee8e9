//! Command execution

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::command::HelmCommand;
use crate::error::{DeployError, Result};

/// Runs planned commands
pub trait CommandRunner {
    fn run(&mut self, command: &HelmCommand) -> Result<()>;
}

/// Spawns commands as child processes of the current one
///
/// Stdio is inherited so Helm's progress and errors reach the user as is.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    current_dir: PathBuf,
}

impl ProcessRunner {
    /// Run commands from `current_dir`; relative build paths and render
    /// targets resolve against it
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: current_dir.into(),
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, command: &HelmCommand) -> Result<()> {
        let mut process = Command::new(&command.program);
        process.args(&command.args).current_dir(&self.current_dir);

        // Output goes to a sibling temporary file, moved into place on success
        let output = match &command.stdout {
            Some(target) => {
                let path = self.current_dir.join(target);
                let dir = path.parent().unwrap_or(&self.current_dir).to_path_buf();
                fs::create_dir_all(&dir).map_err(|e| DeployError::write(&dir, e))?;
                let file = NamedTempFile::new_in(&dir).map_err(|e| DeployError::write(&dir, e))?;
                let handle = file.reopen().map_err(|e| DeployError::write(file.path(), e))?;
                process.stdout(Stdio::from(handle));
                Some((file, path))
            }
            None => None,
        };

        debug!(program = %command.program, args = ?command.args, "spawning command");
        info!(%command, "running");

        let status = process.status().map_err(|source| DeployError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(DeployError::CommandFailed {
                command: command.to_string(),
                code: status.code(),
            });
        }

        if let Some((file, path)) = output {
            file.persist(&path)
                .map_err(|e| DeployError::write(&path, e.error))?;
            debug!(path = %path.display(), "saved command output");
        }
        Ok(())
    }
}

/// Records commands instead of running them
#[derive(Debug, Default)]
pub struct RecordingRunner {
    pub commands: Vec<HelmCommand>,
    fail_at: Option<(usize, i32)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the command at `index` fail with exit code `code`
    pub fn failing_at(index: usize, code: i32) -> Self {
        Self {
            commands: Vec::new(),
            fail_at: Some((index, code)),
        }
    }

    /// Recorded command lines
    pub fn lines(&self) -> Vec<String> {
        self.commands.iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, command: &HelmCommand) -> Result<()> {
        let index = self.commands.len();
        self.commands.push(command.clone());

        match self.fail_at {
            Some((at, code)) if at == index => Err(DeployError::CommandFailed {
                command: command.to_string(),
                code: Some(code),
            }),
            _ => Ok(()),
        }
    }
}
