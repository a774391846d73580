use crate::command::Command;
use crate::interpreter::ShellState;
use crate::status::ExitStatus;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use nix::sys::signal::{Signal, kill};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in the shell process, without forking. They ignore redirection and `&`.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Executes the command against the shell state.
    ///
    /// Returns the status the shell should record afterwards.
    fn execute(self, stdout: &mut dyn Write, shell: &mut ShellState) -> Result<ExitStatus>;
}

type Runner = fn(&mut ShellState, &Command, &mut dyn Write) -> io::Result<ExitStatus>;

fn builtins() -> [(&'static str, Runner); 3] {
    [
        (Exit::name(), run::<Exit> as Runner),
        (Cd::name(), run::<Cd> as Runner),
        (Status::name(), run::<Status> as Runner),
    ]
}

/// Run `cmd` if it names a built-in. Returns `None` for anything else.
///
/// The `Err` case only covers failures to write to `stdout`.
pub fn dispatch(
    shell: &mut ShellState,
    cmd: &Command,
    stdout: &mut dyn Write,
) -> Option<io::Result<ExitStatus>> {
    let (_, runner) = builtins()
        .into_iter()
        .find(|(name, _)| *name == cmd.name())?;
    Some(runner(shell, cmd, stdout))
}

fn run<T: BuiltinCommand>(
    shell: &mut ShellState,
    cmd: &Command,
    stdout: &mut dyn Write,
) -> io::Result<ExitStatus> {
    // Built-ins take no options, so every word is an operand, dashes included.
    let args: Vec<&str> = std::iter::once("--")
        .chain(cmd.args().iter().map(String::as_str))
        .collect();
    let builtin = match T::from_args(&[T::name()], &args) {
        Ok(builtin) => builtin,
        Err(EarlyExit { output, .. }) => {
            writeln!(stdout, "{}", output.trim_end())?;
            return Ok(shell.status);
        }
    };

    match builtin.execute(stdout, shell) {
        Ok(status) => Ok(status),
        Err(err) => match err.downcast::<io::Error>() {
            Ok(io_err) => Err(io_err),
            Err(err) => {
                writeln!(stdout, "{err:#}")?;
                Ok(shell.status)
            }
        },
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to, absolute or relative; defaults to $HOME and extra words are ignored.
    pub args: Vec<String>,
}

impl Cd {
    fn change_to(new_dir: &Path) -> Result<PathBuf> {
        let dir = fs::canonicalize(new_dir)
            .with_context(|| format!("cd: cannot resolve {}", new_dir.display()))?;
        env::set_current_dir(&dir)
            .with_context(|| format!("cd: cannot enter {}", dir.display()))?;
        Ok(dir)
    }
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, shell: &mut ShellState) -> Result<ExitStatus> {
        let target = match self.args.into_iter().next().filter(|t| !t.is_empty()) {
            Some(t) => PathBuf::from(t),
            None => match shell.env.home() {
                Some(home) => home,
                None => {
                    debug!("cd: no target and HOME not set");
                    return Ok(shell.status);
                }
            },
        };

        // Failures leave the directory unchanged and are not reported.
        match Self::change_to(&shell.env.resolve(&target)) {
            Ok(dir) => {
                debug!(dir = %dir.display(), "changed directory");
                shell.env.current_dir = dir;
            }
            Err(err) => debug!("{err:#}"),
        }
        Ok(shell.status)
    }
}

#[derive(FromArgs)]
/// Print how the last foreground command ended.
pub struct Status {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Status {
    fn name() -> &'static str {
        "status"
    }

    fn execute(self, stdout: &mut dyn Write, shell: &mut ShellState) -> Result<ExitStatus> {
        writeln!(stdout, "{}", shell.status).context("status: writing report")?;
        stdout.flush().context("status: flushing report")?;
        Ok(shell.status)
    }
}

#[derive(FromArgs)]
/// Terminate all background jobs and exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; the shell always exits with the last status.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, shell: &mut ShellState) -> Result<ExitStatus> {
        for job in shell.jobs.drain() {
            match kill(job.pid, Signal::SIGTERM) {
                Ok(()) => info!(pid = %job.pid, command = %job.command, "terminated background job"),
                Err(err) => warn!(pid = %job.pid, %err, "failed to signal background job"),
            }
        }
        shell.should_exit = true;
        Ok(shell.status)
    }
}
