//! Signal dispositions for the shell and its children.
//!
//! The shell ignores SIGINT and turns SIGTSTP into a toggle for
//! foreground-only mode. Children get one of two fixed profiles, applied
//! between `fork` and `exec`:
//!
//! | child      | SIGINT  | SIGTSTP |
//! |------------|---------|---------|
//! | foreground | default | ignore  |
//! | background | ignore  | ignore  |

use crate::error::ExecError;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use nix::sys::signal::{sigaction, sigprocmask};
use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the shell honours `&`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Interactive,
    /// Every command runs in the foreground regardless of `&`.
    ForegroundOnly,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Interactive => Mode::ForegroundOnly,
            Mode::ForegroundOnly => Mode::Interactive,
        }
    }

    pub fn allows_background(self) -> bool {
        self == Mode::Interactive
    }

    /// Message printed when the shell switches into this mode.
    pub fn announcement(self) -> &'static str {
        match self {
            Mode::Interactive => "Exiting foreground-only mode",
            Mode::ForegroundOnly => "Entering foreground-only mode (& is now ignored)",
        }
    }

    fn from_flag(foreground_only: bool) -> Self {
        if foreground_only {
            Mode::ForegroundOnly
        } else {
            Mode::Interactive
        }
    }
}

static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigtstp(_: c_int) {
    FOREGROUND_ONLY.fetch_xor(true, Ordering::SeqCst);
}

/// Flip the process-wide foreground-only request, as SIGTSTP does.
pub fn toggle_requested_mode() -> Mode {
    Mode::from_flag(!FOREGROUND_ONLY.fetch_xor(true, Ordering::SeqCst))
}

/// Mode most recently requested through SIGTSTP or [`toggle_requested_mode`].
pub fn requested_mode() -> Mode {
    Mode::from_flag(FOREGROUND_ONLY.load(Ordering::SeqCst))
}

pub fn set_requested_mode(mode: Mode) {
    FOREGROUND_ONLY.store(mode == Mode::ForegroundOnly, Ordering::SeqCst);
}

/// Install the shell's own dispositions: ignore SIGINT, toggle on SIGTSTP.
pub fn install_shell_handlers() -> Result<(), ExecError> {
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    let toggle = SigAction::new(
        SigHandler::Handler(on_sigtstp),
        SaFlags::SA_RESTART,
        SigSet::all(),
    );

    // SAFETY: the handler only touches an atomic.
    unsafe {
        sigaction(Signal::SIGINT, &ignore).map_err(ExecError::Signal)?;
        sigaction(Signal::SIGTSTP, &toggle).map_err(ExecError::Signal)?;
    }
    Ok(())
}

/// Dispositions a child installs for itself before exec.
#[derive(Debug, Clone, Copy)]
pub struct SignalPolicy {
    pub interrupt: SigHandler,
    pub stop: SigHandler,
}

impl SignalPolicy {
    pub const FOREGROUND: SignalPolicy = SignalPolicy {
        interrupt: SigHandler::SigDfl,
        stop: SigHandler::SigIgn,
    };

    pub const BACKGROUND: SignalPolicy = SignalPolicy {
        interrupt: SigHandler::SigIgn,
        stop: SigHandler::SigIgn,
    };

    pub fn for_child(background: bool) -> Self {
        if background {
            Self::BACKGROUND
        } else {
            Self::FOREGROUND
        }
    }

    /// Install this profile in the calling process.
    ///
    /// Only meant for a freshly forked child: it overwrites the shell's own
    /// handlers.
    pub fn apply(&self) -> nix::Result<()> {
        let interrupt = SigAction::new(self.interrupt, SaFlags::empty(), SigSet::empty());
        let stop = SigAction::new(self.stop, SaFlags::empty(), SigSet::empty());

        // SAFETY: only SigDfl and SigIgn are installed, no handler code runs.
        unsafe {
            sigaction(Signal::SIGINT, &interrupt)?;
            sigaction(Signal::SIGTSTP, &stop)?;
        }
        Ok(())
    }
}

/// Keeps SIGTSTP blocked for the calling thread while alive.
///
/// Used around the foreground wait so a Ctrl-Z toggle is delivered only
/// after the foreground child has finished.
pub struct StopSignalBlock {
    set: SigSet,
}

impl StopSignalBlock {
    pub fn new() -> nix::Result<Self> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGTSTP);
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(&set), None)?;
        Ok(Self { set })
    }
}

impl Drop for StopSignalBlock {
    fn drop(&mut self) {
        if let Err(err) = sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&self.set), None) {
            tracing::warn!(%err, "failed to unblock SIGTSTP");
        }
    }
}
