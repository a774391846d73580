//! Errors raised while turning a [`Command`](crate::command::Command) into a process.
//!
//! Only the parent side ever sees these as values. The child side reports
//! redirection and exec failures by printing a diagnostic and exiting with
//! status 1, so a foreground parent observes them as `exit value 1`.

use std::fmt;

/// Which standard stream a redirection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// `fork` failed, usually from process or memory exhaustion.
    #[error("cannot spawn process: {0}")]
    Spawn(#[source] nix::Error),

    /// A redirection target could not be opened or duplicated.
    #[error("cannot open {path} for {direction}")]
    Redirection { path: String, direction: Direction },

    /// The executable could not be found or run.
    #[error("{name}: no such file or directory")]
    Exec { name: String },

    /// An argument contained an interior NUL byte and cannot be passed to exec.
    #[error("{0}: argument contains a NUL byte")]
    InvalidArgument(String),

    /// Waiting on a foreground child failed.
    #[error("wait for pid {pid} failed: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    /// Changing the shell's signal mask or dispositions failed.
    #[error("signal setup failed: {0}")]
    Signal(#[source] nix::Error),

    /// Writing to the shell's own output failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExecError>;
