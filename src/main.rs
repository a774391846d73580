use anyhow::Context;
use argh::FromArgs;
use smallsh::env::Environment;
use smallsh::signals::{self, Mode};
use smallsh::{Interpreter, ShellState};
use std::io;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// A small shell with foreground and background job control.
struct Args {
    #[argh(option, default = "String::from(\":\")")]
    /// prompt printed before each command line.
    prompt: String,

    #[argh(switch)]
    /// start with '&' ignored, as if Ctrl-Z had already been pressed.
    foreground_only: bool,

    #[argh(switch, short = 'd')]
    /// log at debug level unless SMALLSH_LOG says otherwise.
    debug: bool,

    #[argh(option, short = 'c')]
    /// run this line instead of reading from the terminal; may be repeated.
    command: Vec<String>,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("SMALLSH_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    init_logging(args.debug);

    signals::install_shell_handlers().context("installing signal handlers")?;
    let mode = if args.foreground_only {
        Mode::ForegroundOnly
    } else {
        Mode::Interactive
    };
    signals::set_requested_mode(mode);

    let mut sh = Interpreter::new(ShellState::new(Environment::new(), mode), args.prompt);
    if args.command.is_empty() {
        sh.repl().context("reading input")?;
    } else {
        sh.run_lines(&args.command, &mut io::stdout())?;
    }

    std::process::exit(sh.shell().status.exit_code())
}
