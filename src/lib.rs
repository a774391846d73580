//! A small interactive shell with foreground and background job control.
//!
//! Lines are parsed into a [`Command`](command::Command) and handed to the
//! [`supervisor`], which runs the built-ins `exit`, `cd` and `status` in
//! process and forks everything else. Foreground children are waited for;
//! background children are tracked in a [`jobs::JobRegistry`] and reaped
//! before each prompt.
//!
//! The main entry point is [`Interpreter`], which owns the session's
//! [`ShellState`] and drives the prompt loop.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
mod interpreter;
pub mod jobs;
pub mod parser;
pub mod redirect;
pub mod signals;
pub mod status;
pub mod supervisor;

pub use interpreter::{Interpreter, ShellState};
