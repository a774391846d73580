use crate::env::Environment;
use crate::error::ExecError;
use crate::jobs::JobRegistry;
use crate::parser;
use crate::signals::{self, Mode};
use crate::status::ExitStatus;
use crate::supervisor;
use rustyline::error::ReadlineError;
use rustyline::{
    Cmd, ConditionalEventHandler, DefaultEditor, Event, EventContext, EventHandler, KeyEvent,
    RepeatCount,
};
use std::io::{self, Write};
use tracing::{debug, error};

/// Mutable state of one shell session.
///
/// Owned by the [`Interpreter`] and lent by `&mut` to the supervisor and the
/// built-ins; nothing else touches it.
#[derive(Debug, Default)]
pub struct ShellState {
    /// How the last foreground command ended.
    pub status: ExitStatus,
    /// Background jobs not yet reaped.
    pub jobs: JobRegistry,
    /// Whether `&` is honoured.
    pub mode: Mode,
    pub env: Environment,
    /// Set by `exit`; the prompt loop stops once it sees it.
    pub should_exit: bool,
}

impl ShellState {
    pub fn new(env: Environment, mode: Mode) -> Self {
        Self {
            env,
            mode,
            ..Self::default()
        }
    }
}

/// A line-oriented shell that runs built-in and external commands.
///
/// Example
/// ```no_run
/// use smallsh::Interpreter;
/// let mut sh = Interpreter::default();
/// sh.run_line("status", &mut std::io::stdout()).unwrap();
/// ```
pub struct Interpreter {
    shell: ShellState,
    prompt: String,
    pid: u32,
}

impl Interpreter {
    pub fn new(shell: ShellState, prompt: impl Into<String>) -> Self {
        Self {
            shell,
            prompt: prompt.into(),
            pid: std::process::id(),
        }
    }

    pub fn shell(&self) -> &ShellState {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut ShellState {
        &mut self.shell
    }

    /// Parse and execute one line, then record the resulting status.
    pub fn run_line(&mut self, line: &str, stdout: &mut dyn Write) -> io::Result<()> {
        let cmd = match parser::parse(line, self.pid) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Ok(()),
            Err(err) => {
                debug!(%err, line, "rejected input");
                writeln!(stdout, "smallsh: {err}")?;
                return stdout.flush();
            }
        };

        self.shell.status = match supervisor::execute(&mut self.shell, &cmd, stdout) {
            Ok(status) => status,
            Err(ExecError::Io(err)) => return Err(err),
            Err(err) => {
                error!(%err, command = %cmd.text, "command failed to start");
                writeln!(stdout, "smallsh: {err}")?;
                stdout.flush()?;
                ExitStatus::FAILURE
            }
        };
        Ok(())
    }

    /// Report background jobs that finished since the last call.
    pub fn report_finished_jobs(&mut self, stdout: &mut dyn Write) -> io::Result<()> {
        for (job, status) in self.shell.jobs.reap() {
            writeln!(stdout, "background pid {} is done: {status}", job.pid)?;
        }
        stdout.flush()
    }

    /// Pick up a foreground-only toggle requested via SIGTSTP or Ctrl-Z.
    pub fn sync_mode(&mut self, stdout: &mut dyn Write) -> io::Result<()> {
        let requested = signals::requested_mode();
        if requested != self.shell.mode {
            debug!(?requested, "switching mode");
            self.shell.mode = requested;
            writeln!(stdout, "{}", requested.announcement())?;
            stdout.flush()?;
        }
        Ok(())
    }

    /// Run each line in order, as if typed at the prompt, then `exit`.
    pub fn run_lines<I, S>(&mut self, lines: I, stdout: &mut dyn Write) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.report_finished_jobs(stdout)?;
            self.run_line(line.as_ref(), stdout)?;
            if self.shell.should_exit {
                return Ok(());
            }
        }
        self.run_line("exit", stdout)
    }

    /// Interactive read-eval loop. Returns once `exit` runs or input ends.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;
        rl.bind_sequence(
            KeyEvent::ctrl('Z'),
            EventHandler::Conditional(Box::new(ForegroundToggle)),
        );
        let mut stdout = io::stdout();

        while !self.shell.should_exit {
            self.report_finished_jobs(&mut stdout)?;
            self.sync_mode(&mut stdout)?;

            match rl.readline(&self.prompt) {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    self.run_line(&line, &mut stdout)?;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => self.run_line("exit", &mut stdout)?,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(ShellState::new(Environment::new(), Mode::Interactive), ":")
    }
}

/// Ctrl-Z at the prompt: the terminal is in raw mode, so no SIGTSTP is
/// generated. Toggle directly and abandon the current line so the mode
/// change is announced right away.
struct ForegroundToggle;

impl ConditionalEventHandler for ForegroundToggle {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        _ctx: &EventContext,
    ) -> Option<Cmd> {
        signals::toggle_requested_mode();
        Some(Cmd::Interrupt)
    }
}
