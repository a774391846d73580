use crate::command::Command;

/// Longest command line the shell accepts, in bytes.
pub const MAX_LINE_LEN: usize = 2048;
/// Most arguments (including the command name) a single command may carry.
pub const MAX_ARGS: usize = 512;

/// Token that expands to the shell's process id.
pub const PID_TOKEN: &str = "$$";

/// Error returned when a line cannot be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsingError {
    /// `<` or `>` was the last token on the line.
    #[error("missing file name after '{0}'")]
    MissingRedirectTarget(char),
    /// The line only contained redirections and/or `&`.
    #[error("missing command name")]
    MissingCommand,
    /// The line exceeds [`MAX_LINE_LEN`].
    #[error("command line longer than {} characters", MAX_LINE_LEN)]
    LineTooLong,
    /// The command has more than [`MAX_ARGS`] arguments.
    #[error("more than {} arguments", MAX_ARGS)]
    TooManyArguments,
}

/// Replace every `$$` in `line` with `pid`, scanning left to right.
pub fn expand_pid(line: &str, pid: u32) -> String {
    line.replace(PID_TOKEN, &pid.to_string())
}

/// Parse one line of input.
///
/// Blank lines and lines starting with `#` produce `Ok(None)`. Tokens are
/// separated by whitespace; `< file` and `> file` set the redirections and
/// a trailing `&` marks the command as background. An `&` anywhere else is
/// an ordinary argument.
pub fn parse(line: &str, pid: u32) -> Result<Option<Command>, ParsingError> {
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if line.len() > MAX_LINE_LEN {
        return Err(ParsingError::LineTooLong);
    }

    let text = expand_pid(line.trim_end(), pid);
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let command = CommandBuilder::new(&tokens).build()?;
    Ok(Some(Command { text, ..command }))
}

struct CommandBuilder<'a> {
    tokens: &'a [&'a str],
    pos: usize,
}

impl<'a> CommandBuilder<'a> {
    fn new(tokens: &'a [&'a str]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn consume(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn is_last(&self) -> bool {
        self.pos == self.tokens.len()
    }

    fn build(mut self) -> Result<Command, ParsingError> {
        let mut command = Command::default();

        while let Some(token) = self.consume() {
            match token {
                "<" => command.input = Some(self.redirect_target('<')?),
                ">" => command.output = Some(self.redirect_target('>')?),
                "&" if self.is_last() => command.background = true,
                arg => {
                    if command.argv.len() == MAX_ARGS {
                        return Err(ParsingError::TooManyArguments);
                    }
                    command.argv.push(arg.to_string());
                }
            }
        }

        if command.argv.is_empty() {
            return Err(ParsingError::MissingCommand);
        }
        Ok(command)
    }

    fn redirect_target(&mut self, op: char) -> Result<String, ParsingError> {
        self.consume()
            .map(str::to_string)
            .ok_or(ParsingError::MissingRedirectTarget(op))
    }
}
