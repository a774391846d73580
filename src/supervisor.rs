//! Turns a [`Command`] into a running process.
//!
//! Built-ins are handed to [`crate::builtin`]. Everything else is forked:
//! the child wires up redirections and signal dispositions and then execs,
//! while the parent either waits for it (foreground) or records it in the
//! job registry and returns at once (background).

use crate::builtin;
use crate::command::Command;
use crate::error::{Direction, ExecError, Result};
use crate::interpreter::ShellState;
use crate::redirect::Redirections;
use crate::signals::{SignalPolicy, StopSignalBlock};
use crate::status::ExitStatus;
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, execvp, fork};
use std::ffi::CString;
use std::io::Write;
use tracing::{debug, info, warn};

/// Dispatch `cmd` and return the status the shell should record.
///
/// For foreground commands this is the child's collapsed status. Built-ins
/// and background spawns return `shell.status` unchanged. The caller is
/// responsible for storing the result.
pub fn execute(shell: &mut ShellState, cmd: &Command, stdout: &mut dyn Write) -> Result<ExitStatus> {
    if cmd.argv.is_empty() {
        return Ok(shell.status);
    }
    if let Some(result) = builtin::dispatch(shell, cmd, stdout) {
        return Ok(result?);
    }

    let background = cmd.background && shell.mode.allows_background();
    if cmd.background && !background {
        debug!(command = %cmd.text, "foreground-only mode, ignoring &");
    }

    let plan = ChildPlan::prepare(cmd, background)?;

    // Anything still buffered would be written twice, once by each process.
    stdout.flush()?;

    // SAFETY: the child only performs redirection, sigaction and exec, then
    // `_exit`s on failure. It never returns into the caller.
    match unsafe { fork() }.map_err(ExecError::Spawn)? {
        ForkResult::Child => plan.run(),
        ForkResult::Parent { child } => {
            if background {
                shell.jobs.insert(child, &cmd.text);
                info!(pid = %child, command = %cmd.text, "started background job");
                writeln!(stdout, "background pid is {child}")?;
                stdout.flush()?;
                Ok(shell.status)
            } else {
                debug!(pid = %child, command = %cmd.text, "waiting for foreground job");
                wait_foreground(child)
            }
        }
    }
}

/// Block until `child` terminates and report its collapsed status.
fn wait_foreground(child: Pid) -> Result<ExitStatus> {
    let _block = StopSignalBlock::new()
        .inspect_err(|err| warn!(%err, "could not block SIGTSTP during wait"))
        .ok();

    loop {
        match waitpid(child, None) {
            Ok(wait_status) => {
                if let Some(status) = ExitStatus::from_wait(wait_status) {
                    debug!(pid = %child, %status, "foreground job finished");
                    return Ok(status.collapsed());
                }
            }
            Err(Errno::EINTR) => continue,
            Err(source) => {
                return Err(ExecError::Wait {
                    pid: child.as_raw(),
                    source,
                });
            }
        }
    }
}

/// Message the child prints if its signal dispositions cannot be installed.
const SIGNAL_SETUP_FAILED: &str = "signal setup failed\n";

/// Everything the child needs, built before `fork` so the child does as
/// little as possible.
///
/// The child only picks one of the prepared diagnostics and writes its bytes.
/// It never allocates.
struct ChildPlan {
    program: CString,
    argv: Vec<CString>,
    redirections: Redirections,
    policy: SignalPolicy,
    input_failed: String,
    output_failed: String,
    exec_failed: String,
}

impl ChildPlan {
    fn prepare(cmd: &Command, background: bool) -> Result<Self> {
        let argv = cmd
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| ExecError::InvalidArgument(cmd.name().to_string()))?;
        let redirections = Redirections::resolve(cmd, background);
        let exec_failed = ExecError::Exec {
            name: cmd.name().to_string(),
        };
        Ok(Self {
            program: argv[0].clone(),
            argv,
            input_failed: redirections.diagnostic(Direction::Input),
            output_failed: redirections.diagnostic(Direction::Output),
            exec_failed: format!("{exec_failed}\n"),
            redirections,
            policy: SignalPolicy::for_child(background),
        })
    }

    /// Child side of the fork. Never returns.
    fn run(self) -> ! {
        let message = self.exec();
        let _ = nix::unistd::write(std::io::stdout(), message.as_bytes());
        // SAFETY: `_exit` skips atexit handlers and stdio flushing, which
        // belong to the parent's copy of the process.
        unsafe { nix::libc::_exit(1) }
    }

    /// Set up the child and exec. Only returns on failure, with the
    /// diagnostic to print.
    fn exec(&self) -> &str {
        if let Err(direction) = self.redirections.apply() {
            return match direction {
                Direction::Input => &self.input_failed,
                Direction::Output => &self.output_failed,
            };
        }
        if self.policy.apply().is_err() {
            return SIGNAL_SETUP_FAILED;
        }
        match execvp(&self.program, &self.argv) {
            Ok(never) => match never {},
            Err(_) => &self.exec_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::Mode;
    use nix::sys::signal::{Signal, kill};
    use nix::sys::wait::WaitStatus;
    use std::fs;
    use tempfile::tempdir;

    fn sh(script: &str) -> Command {
        Command::new(["sh", "-c", script])
    }

    fn run(shell: &mut ShellState, cmd: &Command) -> (ExitStatus, String) {
        let mut out = Vec::new();
        let status = execute(shell, cmd, &mut out).unwrap();
        (status, String::from_utf8(out).unwrap())
    }

    #[test]
    fn foreground_success_and_failure_are_collapsed() {
        let mut shell = ShellState::default();

        assert_eq!(run(&mut shell, &Command::new(["true"])).0, ExitStatus::Exited(0));
        assert_eq!(run(&mut shell, &Command::new(["false"])).0, ExitStatus::Exited(1));
        assert_eq!(run(&mut shell, &sh("exit 7")).0, ExitStatus::Exited(1));
    }

    #[test]
    fn foreground_signal_death_reports_signal_number() {
        let mut shell = ShellState::default();
        let (status, _) = run(&mut shell, &sh("kill -TERM $$"));
        assert_eq!(status, ExitStatus::Signaled(Signal::SIGTERM as i32));
        assert!(status.is_signal());
    }

    #[test]
    fn foreground_result_does_not_depend_on_previous_status() {
        let mut shell = ShellState::default();
        shell.status = ExitStatus::Signaled(9);
        let (status, _) = run(&mut shell, &Command::new(["true"]));
        assert_eq!(status, ExitStatus::Exited(0));
    }

    #[test]
    fn unknown_program_exits_with_failure() {
        let mut shell = ShellState::default();
        let (status, _) = run(&mut shell, &Command::new(["smallsh-no-such-program-xyz"]));
        assert_eq!(status, ExitStatus::Exited(1));
    }

    #[test]
    fn unknown_program_diagnostic_goes_to_redirected_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out");
        let mut shell = ShellState::default();

        let cmd = Command::new(["smallsh-no-such-program-xyz"]).with_output(output.to_string_lossy());
        let (status, printed) = run(&mut shell, &cmd);

        assert_eq!(status, ExitStatus::Exited(1));
        assert!(printed.is_empty());
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "smallsh-no-such-program-xyz: no such file or directory\n"
        );
    }

    #[test]
    fn diagnostics_are_rendered_before_forking() {
        let cmd = Command::new(["sort"])
            .with_input("/smallsh/in")
            .in_background();
        let plan = ChildPlan::prepare(&cmd, true).unwrap();

        assert_eq!(plan.input_failed, "cannot open /smallsh/in for input\n");
        assert_eq!(plan.output_failed, "cannot open /dev/null for output\n");
        assert_eq!(plan.exec_failed, "sort: no such file or directory\n");
        assert_eq!(plan.argv, [CString::new("sort").unwrap()]);
    }

    #[test]
    fn missing_input_file_fails_the_child_only() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let mut shell = ShellState::default();
        let cwd_before = shell.env.current_dir.clone();

        let cmd = Command::new(["cat"]).with_input(missing.to_string_lossy());
        let (status, _) = run(&mut shell, &cmd);

        assert_eq!(status, ExitStatus::Exited(1));
        assert_eq!(shell.env.current_dir, cwd_before);
        assert!(shell.jobs.is_empty());
    }

    #[test]
    fn redirects_input_and_output_to_files() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, "b\na\nc\n").unwrap();
        fs::write(&output, "stale contents that must be truncated\n").unwrap();

        let mut shell = ShellState::default();
        let cmd = Command::new(["sort"])
            .with_input(input.to_string_lossy())
            .with_output(output.to_string_lossy());
        let (status, _) = run(&mut shell, &cmd);

        assert_eq!(status, ExitStatus::Exited(0));
        assert_eq!(fs::read_to_string(&output).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn background_spawn_registers_job_and_keeps_status() {
        let mut shell = ShellState::default();
        shell.status = ExitStatus::Signaled(2);

        let cmd = Command::new(["sleep", "30"]).in_background();
        let (status, printed) = run(&mut shell, &cmd);

        assert_eq!(status, ExitStatus::Signaled(2));
        assert_eq!(shell.jobs.len(), 1);

        let job = shell.jobs.iter().next().unwrap().clone();
        assert_eq!(printed, format!("background pid is {}\n", job.pid));
        assert_eq!(job.command, "sleep 30 &");

        kill(job.pid, Signal::SIGKILL).unwrap();
        assert!(matches!(
            waitpid(job.pid, None).unwrap(),
            WaitStatus::Signaled(_, Signal::SIGKILL, _)
        ));
    }

    #[test]
    fn background_job_reads_from_dev_null() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("copied.txt");
        let mut shell = ShellState::default();

        let cmd = sh(&format!("cat > '{}'", output.display())).in_background();
        run(&mut shell, &cmd);

        let pid = shell.jobs.iter().next().unwrap().pid;
        assert!(matches!(waitpid(pid, None).unwrap(), WaitStatus::Exited(_, 0)));
        assert_eq!(fs::read_to_string(&output).unwrap(), "");
    }

    #[test]
    fn foreground_only_mode_ignores_background_flag() {
        let mut shell = ShellState::default();
        shell.mode = Mode::ForegroundOnly;

        let cmd = Command::new(["false"]).in_background();
        let (status, printed) = run(&mut shell, &cmd);

        assert_eq!(status, ExitStatus::Exited(1));
        assert!(shell.jobs.is_empty());
        assert!(printed.is_empty());
    }

    #[test]
    fn empty_command_is_a_no_op() {
        let mut shell = ShellState::default();
        shell.status = ExitStatus::Exited(1);
        let (status, printed) = run(&mut shell, &Command::default());
        assert_eq!(status, ExitStatus::Exited(1));
        assert!(printed.is_empty());
    }

    #[test]
    fn nul_byte_in_argument_is_rejected_before_forking() {
        let mut shell = ShellState::default();
        let mut out = Vec::new();
        let err = execute(&mut shell, &Command::new(["echo", "a\0b"]), &mut out).unwrap_err();
        assert!(matches!(err, ExecError::InvalidArgument(name) if name == "echo"));
    }
}
