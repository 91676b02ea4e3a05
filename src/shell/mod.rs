use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Launches external commands on behalf of panel controls
///
/// Launches are fire-and-forget: the caller never owns the child process and
/// never sees its exit status.
pub trait CommandRunner {
    /// Start `command` with `args` appended as separate arguments
    ///
    /// `command` may itself contain arguments and is interpreted by the shell.
    /// Each entry of `args` reaches the program verbatim.
    ///
    /// # Errors
    /// Returns an error if the process could not be started
    fn spawn(&self, command: &str, args: &[String], in_terminal: bool) -> Result<()>;
}

/// Runs commands through the system shell
pub struct SpawnRunner {
    terminal: String,
}

impl SpawnRunner {
    /// Create a runner using `terminal` for commands that want a terminal
    #[must_use]
    pub fn new(terminal: impl Into<String>) -> Self {
        Self {
            terminal: terminal.into(),
        }
    }

    fn shell_command(command: &str, args: &[String]) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd.exe");
            cmd.arg("/C").arg(command).args(args);
            cmd
        }

        #[cfg(not(windows))]
        {
            // "$@" keeps every argument intact, including spaces
            let mut cmd = Command::new("/bin/sh");
            cmd.arg("-c")
                .arg(format!("exec {command} \"$@\""))
                .arg("sh")
                .args(args);
            cmd
        }
    }

    fn build(&self, command: &str, args: &[String], in_terminal: bool) -> Result<Command> {
        if !in_terminal {
            return Ok(Self::shell_command(command, args));
        }

        let terminal = which::which(&self.terminal)
            .with_context(|| format!("Terminal emulator '{}' not found", self.terminal))?;

        let inner = Self::shell_command(command, args);
        let mut cmd = Command::new(terminal);
        cmd.arg("-e").arg(inner.get_program()).args(inner.get_args());
        Ok(cmd)
    }
}

impl Default for SpawnRunner {
    fn default() -> Self {
        Self::new("xterm")
    }
}

impl CommandRunner for SpawnRunner {
    fn spawn(&self, command: &str, args: &[String], in_terminal: bool) -> Result<()> {
        let mut child = self
            .build(command, args, in_terminal)?
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to run '{command}'"))?;

        info!("Started '{}' (pid {})", command, child.id());

        // Reap the child so it does not linger as a zombie
        let label = command.to_string();
        std::thread::spawn(move || match child.wait() {
            Ok(status) => debug!("'{}' exited with {}", label, status),
            Err(e) => debug!("Failed to wait for '{}': {}", label, e),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn test_shell_command_passes_args_verbatim() {
        let cmd = SpawnRunner::shell_command("xftrash", &["/tmp/a file".to_string()]);
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(cmd.get_program(), "/bin/sh");
        assert_eq!(args, vec!["-c", "exec xftrash \"$@\"", "sh", "/tmp/a file"]);
    }

    #[test]
    fn test_missing_terminal_is_an_error() {
        let runner = SpawnRunner::new("definitely-not-a-terminal-emulator");
        assert!(runner.build("true", &[], true).is_err());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_spawn_does_not_wait() {
        let runner = SpawnRunner::default();
        assert!(runner.spawn("true", &[], false).is_ok());
    }
}
