//! Executor process management (startup/IO/shutdown).

use std::{process::Stdio, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use tokio::{
    io::BufReader,
    process::{Child, ChildStdin, ChildStdout, Command},
};

use crate::{
    config::Config,
    execution::{ExecutionResult, Interpreter},
    error::DriverResult,
};

/// How long `terminate` waits for a clean exit before killing the child.
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Program and arguments that start an executor loop on stdin/stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    pub program: String,
    pub args: Vec<String>,
}

impl Launcher {
    /// This binary's own `serve` subcommand.
    pub fn current_exe() -> Result<Self> {
        let exe = std::env::current_exe().context("cannot locate the codebox executable")?;
        Ok(Self {
            program: exe.to_string_lossy().into_owned(),
            args: vec!["serve".into()],
        })
    }

    /// Whitespace-separated command line, e.g. a sandbox CLI wrapping `codebox serve`.
    pub fn parse(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| anyhow!("executor command is empty"))?;
        Ok(Self { program, args: parts.collect() })
    }

    /// `EXECUTOR_COMMAND` when set, otherwise [`Launcher::current_exe`].
    pub fn from_config(cfg: &Config) -> Result<Self> {
        match cfg.get("EXECUTOR_COMMAND").filter(|c| !c.trim().is_empty()) {
            Some(cmd) => Self::parse(&cmd),
            None => Self::current_exe(),
        }
    }
}

pub type ProcessInterpreter = Interpreter<ChildStdin, BufReader<ChildStdout>>;

/// A spawned executor and the interpreter talking to it.
pub struct ExecutorProcess {
    child: Child,
    interpreter: ProcessInterpreter,
}

impl ExecutorProcess {
    pub async fn spawn(launcher: &Launcher, timeout: Duration) -> Result<Self> {
        let mut cmd = Command::new(&launcher.program);
        cmd.args(&launcher.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to start executor: {}", launcher.program))?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("no stdout"))?;

        tracing::debug!(program = %launcher.program, pid = ?child.id(), "executor started");

        let interpreter = Interpreter::new(stdin, BufReader::new(stdout)).with_timeout(timeout);
        Ok(Self { child, interpreter })
    }

    pub fn interpreter(&mut self) -> &mut ProcessInterpreter {
        &mut self.interpreter
    }

    pub async fn run_code(&mut self, code: &str) -> DriverResult<ExecutionResult> {
        self.interpreter.run_code(code).await
    }

    /// Close the executor's input and reap it, killing it if it lingers.
    pub async fn terminate(self) -> Result<()> {
        let Self { mut child, interpreter } = self;
        drop(interpreter.into_inner());

        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::debug!(%status, "executor exited");
                if !status.success() {
                    bail!("executor exited with {}", status);
                }
            }
            Err(_) => {
                tracing::warn!("executor did not exit, killing it");
                child.kill().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_program_and_args() {
        let l = Launcher::parse("  docker exec -i box codebox serve ").unwrap();
        assert_eq!(l.program, "docker");
        assert_eq!(l.args, vec!["exec", "-i", "box", "codebox", "serve"]);
    }

    #[test]
    fn empty_command_is_an_error() {
        assert!(Launcher::parse("   ").is_err());
    }

    #[test]
    fn config_override_wins() {
        let mut cfg = Config::with_defaults();
        cfg.set("EXECUTOR_COMMAND", "sandbox run codebox serve");
        let l = Launcher::from_config(&cfg).unwrap();
        assert_eq!(l.program, "sandbox");
    }

    #[test]
    fn default_is_own_serve_subcommand() {
        let l = Launcher::from_config(&Config::with_defaults()).unwrap();
        assert_eq!(l.args, vec!["serve"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn child_that_exits_immediately_reports_end_of_stream() {
        let launcher = Launcher::parse("true").unwrap();
        let mut p = ExecutorProcess::spawn(&launcher, Duration::from_secs(5)).await.unwrap();
        let err = p.interpreter().submit("print(1)").await.unwrap_err();
        assert!(
            matches!(err, crate::error::DriverError::EndOfStream | crate::error::DriverError::Io(_)),
            "{err}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cat_echoes_a_request_back_as_malformed_reply() {
        // `cat` sends our request line straight back, which is not a reply shape.
        let launcher = Launcher::parse("cat").unwrap();
        let mut p = ExecutorProcess::spawn(&launcher, Duration::from_secs(5)).await.unwrap();
        let err = p.interpreter().submit("print(1)").await.unwrap_err();
        assert!(matches!(err, crate::error::DriverError::Malformed { .. }), "{err}");
        p.terminate().await.unwrap();
    }
}
