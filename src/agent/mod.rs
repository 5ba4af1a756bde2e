//! Command routing core: tokenizer, command handlers and dispatcher.

pub mod commands;
pub mod dispatcher;
pub mod router;

pub use self::commands::{
    Command, CommandContext, DescribeCommand, GetAppCommand, LogsCommand, SET_APP_USAGE,
    SetAppCommand, builtin_commands, welcome_text,
};
pub use self::dispatcher::{DispatchOutcome, Dispatcher};
pub use self::router::{CommandLine, parse_command_line};
