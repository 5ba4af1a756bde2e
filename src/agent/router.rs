//! Tokenizing chat text into a command line.
//!
//! Messages addressed to the bot look like `@bot <command> [args...]`.
//! The first token is the bot's own mention and only matters for the
//! welcome text.

/// A whitespace-tokenized message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// First token: how the sender addressed the bot.
    pub me: String,
    /// Second token, if any.
    pub command: Option<String>,
    /// Everything after the command.
    pub args: Vec<String>,
}

/// Split `text` on whitespace. Returns `None` for blank text.
pub fn parse_command_line(text: &str) -> Option<CommandLine> {
    let mut tokens = text.split_whitespace();
    let me = tokens.next()?.to_string();
    let command = tokens.next().map(str::to_string);
    let args = tokens.map(str::to_string).collect();

    Some(CommandLine { me, command, args })
}
