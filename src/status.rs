use crate::command::ExitCode;
use nix::sys::wait::WaitStatus;
use std::fmt;

/// How the last foreground command ended.
///
/// This is the value `status` reports. A fresh shell starts at `Exited(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal termination with the given exit code.
    Exited(ExitCode),
    /// Killed by the given signal number.
    Signaled(i32),
}

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus::Exited(0);
    pub const FAILURE: ExitStatus = ExitStatus::Exited(1);

    /// Convert a terminal wait result. Returns `None` for stop/continue
    /// notifications and `StillAlive`, which do not end a process.
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(ExitStatus::Signaled(signal as i32)),
            _ => None,
        }
    }

    /// Foreground statuses only distinguish success from failure: any non-zero
    /// exit code becomes 1. Signal numbers are kept as-is.
    pub fn collapsed(self) -> Self {
        match self {
            ExitStatus::Exited(0) => ExitStatus::SUCCESS,
            ExitStatus::Exited(_) => ExitStatus::FAILURE,
            signaled => signaled,
        }
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, ExitStatus::Signaled(_))
    }

    /// Exit code or signal number, whichever applies.
    pub fn value(&self) -> i32 {
        match *self {
            ExitStatus::Exited(code) => code,
            ExitStatus::Signaled(signal) => signal,
        }
    }

    /// Code suitable for the shell's own process exit, using the usual
    /// `128 + signal` convention for signal deaths.
    pub fn exit_code(&self) -> ExitCode {
        match *self {
            ExitStatus::Exited(code) => code,
            ExitStatus::Signaled(signal) => 128 + signal,
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        ExitStatus::SUCCESS
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit value {code}"),
            ExitStatus::Signaled(signal) => write!(f, "terminated by signal {signal}"),
        }
    }
}
