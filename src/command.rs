/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// A single parsed command line, ready to be dispatched.
///
/// `argv[0]` is the command name and is what gets passed to `execvp`. The
/// input and output targets are whatever the user typed after `<` and `>`;
/// when absent the child inherits the shell's streams (or `/dev/null` for
/// background jobs, see [`crate::redirect`]).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    /// Argument vector, never empty for a parsed command.
    pub argv: Vec<String>,
    /// Path given after `<`.
    pub input: Option<String>,
    /// Path given after `>`.
    pub output: Option<String>,
    /// Set when the line ended with `&`.
    pub background: bool,
    /// The command line as entered, after `$$` expansion.
    pub text: String,
}

impl Command {
    /// Build a foreground command with no redirections from an argument list.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let text = argv.join(" ");
        Self {
            argv,
            text,
            ..Self::default()
        }
    }

    /// Command name, i.e. `argv[0]`. Empty for an empty argument vector.
    pub fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    /// Arguments following the command name.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }

    pub fn with_input(mut self, path: impl Into<String>) -> Self {
        self.input = Some(path.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<String>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn in_background(mut self) -> Self {
        self.background = true;
        self.text.push_str(" &");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_args_split_argv() {
        let cmd = Command::new(["ls", "-l", "/tmp"]);
        assert_eq!(cmd.name(), "ls");
        assert_eq!(cmd.args(), &["-l".to_string(), "/tmp".to_string()]);
        assert_eq!(cmd.text, "ls -l /tmp");
    }

    #[test]
    fn empty_command_has_empty_name() {
        let cmd = Command::default();
        assert_eq!(cmd.name(), "");
        assert!(cmd.args().is_empty());
    }
}
