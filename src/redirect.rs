use crate::command::Command;
use crate::error::{Direction, ExecError};
use nix::unistd::{dup2_stdin, dup2_stdout};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;

/// Where background jobs read from and write to unless told otherwise.
pub const DEV_NULL: &str = "/dev/null";

/// Effective stdin/stdout targets for one child.
///
/// `None` means the child keeps the stream it inherited from the shell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Redirections {
    pub input: Option<String>,
    pub output: Option<String>,
}

impl Redirections {
    /// Pick the targets for `cmd`. An explicit `<`/`>` always wins; otherwise
    /// a background child gets `/dev/null` and a foreground child inherits.
    ///
    /// `background` is the effective flag, after foreground-only mode has
    /// been taken into account.
    pub fn resolve(cmd: &Command, background: bool) -> Self {
        let fallback = || background.then(|| DEV_NULL.to_string());
        Self {
            input: cmd.input.clone().or_else(fallback),
            output: cmd.output.clone().or_else(fallback),
        }
    }

    /// Open the targets and splice them over fds 0 and 1.
    ///
    /// Runs inside the forked child. Input is handled before output, and the
    /// first failing direction is returned without touching the other stream.
    pub fn apply(&self) -> Result<(), Direction> {
        if let Some(path) = &self.input {
            let file = File::open(path).map_err(|_| Direction::Input)?;
            dup2_stdin(&file).map_err(|_| Direction::Input)?;
        }
        if let Some(path) = &self.output {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o644)
                .open(path)
                .map_err(|_| Direction::Output)?;
            dup2_stdout(&file).map_err(|_| Direction::Output)?;
        }
        Ok(())
    }

    /// Message the child prints when `direction` cannot be redirected.
    pub fn diagnostic(&self, direction: Direction) -> String {
        let path = match direction {
            Direction::Input => &self.input,
            Direction::Output => &self.output,
        };
        let err = ExecError::Redirection {
            path: path.clone().unwrap_or_default(),
            direction,
        };
        format!("{err}\n")
    }
}
