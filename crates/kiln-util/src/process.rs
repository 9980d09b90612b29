//! Process invocation for Kiln.
//!
//! Commands are built as explicit argument lists and handed straight to the
//! OS; nothing is ever re-parsed through a shell.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::UtilError;

/// A command to run: program, argument list, working directory, environment.
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

/// Structured output from a captured command execution.
#[derive(Debug)]
pub struct CommandOutput {
    /// Standard output as a string.
    pub stdout: String,
    /// Standard error as a string.
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

/// Exit information from a streamed command execution.
#[derive(Debug, Clone, Copy)]
pub struct ExitInfo {
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessCommand {
    /// Create a command for `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a list of arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the child process.
    ///
    /// A relative `program` (e.g. `./Configure`) resolves inside this
    /// directory.
    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// The program this command will run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The argument list this command will pass.
    pub fn argv(&self) -> &[String] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Execute the command and capture its output.
    ///
    /// # Errors
    /// Returns an error if the command cannot be spawned (e.g. binary not
    /// found). A non-zero exit code is **not** an error; check
    /// `CommandOutput::success` instead.
    pub fn capture(&self) -> Result<CommandOutput, UtilError> {
        let output = self.command().output().map_err(|source| UtilError::CommandExec {
            program: self.program.display().to_string(),
            source,
        })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            exit_code: output.status.code(),
        })
    }

    /// Execute the command with stdout/stderr inherited from this process.
    ///
    /// External build tools produce the only build log there is, so their
    /// output streams through untouched.
    ///
    /// # Errors
    /// Returns an error if the command cannot be spawned. A non-zero exit
    /// code is **not** an error; check `ExitInfo::success` instead.
    pub fn stream(&self) -> Result<ExitInfo, UtilError> {
        let status = self.command().status().map_err(|source| UtilError::CommandExec {
            program: self.program.display().to_string(),
            source,
        })?;

        Ok(ExitInfo {
            success: status.success(),
            exit_code: status.code(),
        })
    }
}
