//! Executor - runs the command line built for a command substitution.
//!
//! The evaluator never spawns anything itself. It hands the joined command line
//! and the environment to an [`Executor`], which makes alternative executors
//! (in-process stubs, sandboxes, remote runners) drop-in replacements.

use super::env::Environment;
use super::expand;
use crate::config::ExecutorConfig;
use std::io;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Errors reported by an executor.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty command line")]
    EmptyCommand,
    #[error("cannot split command line {command:?}: {reason}")]
    Split { command: String, reason: String },
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("command {command:?} exited with status {code}: {stderr}")]
    Status {
        command: String,
        /// Exit code, or -1 when the process was killed by a signal.
        code: i32,
        stderr: String,
    },
    /// Failure reported by a custom executor.
    #[error("{0}")]
    Other(String),
}

/// Runs a command line and returns what it printed.
pub trait Executor {
    fn execute(&self, command: &str, env: &Environment) -> Result<String, ExecError>;
}

impl<F> Executor for F
where
    F: Fn(&str, &Environment) -> Result<String, ExecError>,
{
    fn execute(&self, command: &str, env: &Environment) -> Result<String, ExecError> {
        self(command, env)
    }
}

/// Default executor: spawns the command as a child process.
///
/// The command line is split into argv with the same quoting rules the word
/// evaluator uses, so a `#` that survived quote removal stays an argument. The
/// child's environment is exactly the mapping passed in unless
/// [`ExecutorConfig::inherit_env`] is set.
///
/// Standard output is decoded as UTF-8, with invalid sequences replaced by
/// U+FFFD, and returned verbatim, trailing newline included. Stripping it is
/// left to the word evaluator's field splitting. Standard error is captured
/// and only surfaced in [`ExecError::Status`].
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    config: ExecutorConfig,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, command: &str, env: &Environment) -> Result<String, ExecError> {
        let argv = expand::split_fields(command).map_err(|e| ExecError::Split {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
        let Some((program, args)) = argv.split_first() else {
            return Err(ExecError::EmptyCommand);
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        if !self.config.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(env);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(program = %program, argc = args.len(), "spawning command");
        let output = cmd.output().map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            tracing::debug!(program = %program, code, "command exited unsuccessfully");
            return Err(ExecError::Status {
                command: command.to_string(),
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        tracing::trace!(bytes = output.stdout.len(), "captured stdout");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
