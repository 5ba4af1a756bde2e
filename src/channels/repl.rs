//! Interactive REPL channel with line editing.
//!
//! Lets an operator talk to the dispatcher from a terminal, without Slack.
//! Each line is treated as message text from the configured user, so the
//! first token is still the bot mention: `@bot logs`, `@bot get-app`.
//!
//! `quit`, `exit`, Ctrl+C or Ctrl+D leave the REPL.

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use rustyline::completion::Completer;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Editor, Helper};
use tokio::sync::{mpsc, oneshot};

use crate::agent::Dispatcher;
use crate::channels::{IncomingMessage, ReplySink};
use crate::error::ChannelError;

/// Channel id given to every REPL message.
pub const REPL_CHANNEL: &str = "repl";

/// Rustyline helper for command-name tab completion.
struct ReplHelper {
    commands: Vec<&'static str>,
}

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(complete_command(line, pos, &self.commands))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {}
impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

/// Complete the second token (the command) of `line` up to `pos`.
fn complete_command(line: &str, pos: usize, commands: &[&str]) -> (usize, Vec<String>) {
    let prefix = &line[..pos];
    let start = prefix
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);

    // Only the token right after the bot mention is a command.
    if prefix[..start].split_whitespace().count() != 1 {
        return (start, Vec::new());
    }

    let word = &prefix[start..];
    let matches = commands
        .iter()
        .filter(|cmd| cmd.starts_with(word))
        .map(|cmd| cmd.to_string())
        .collect();
    (start, matches)
}

/// Get the history file path (~/.opsbot/history).
fn history_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".opsbot")
        .join("history")
}

/// Prints replies to stdout.
struct TerminalSink;

#[async_trait]
impl ReplySink for TerminalSink {
    fn name(&self) -> &str {
        REPL_CHANNEL
    }

    async fn post_message(&self, _channel: &str, text: &str) -> Result<(), ChannelError> {
        let mut out = io::stdout().lock();
        writeln!(out, "\x1b[90m{}\x1b[0m", "\u{2500}".repeat(60))
            .and_then(|_| writeln!(out, "{}", text.trim_end()))
            .and_then(|_| out.flush())
            .map_err(|e| ChannelError::SendFailed {
                name: REPL_CHANNEL.to_string(),
                reason: e.to_string(),
            })
    }
}

/// A line read from the terminal plus the signal to show the next prompt.
type PendingLine = (String, oneshot::Sender<()>);

/// REPL channel bound to one sender identity.
pub struct ReplChannel {
    user_id: String,
    /// Optional single message to send (for -m flag).
    single_message: Option<String>,
}

impl ReplChannel {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            single_message: None,
        }
    }

    /// Send one message, print the reply and exit.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.single_message = Some(message.into());
        self
    }

    /// Run until the operator quits.
    pub async fn run(self, dispatcher: Arc<Dispatcher>) -> Result<(), ChannelError> {
        let sink: Arc<dyn ReplySink> = Arc::new(TerminalSink);

        if let Some(text) = self.single_message {
            let msg = IncomingMessage::new(REPL_CHANNEL, self.user_id.as_str(), text);
            dispatcher.handle(&msg, sink).await?;
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<PendingLine>(1);
        let commands = dispatcher.command_names();
        std::thread::spawn(move || read_lines(tx, commands));

        while let Some((line, done)) = rx.recv().await {
            let msg = IncomingMessage::new(REPL_CHANNEL, self.user_id.as_str(), line);
            if let Err(e) = dispatcher.handle(&msg, Arc::clone(&sink)).await {
                eprintln!("\x1b[31m{e}\x1b[0m");
            }
            let _ = done.send(());
        }

        Ok(())
    }
}

/// Blocking rustyline loop; runs on its own thread.
fn read_lines(tx: mpsc::Sender<PendingLine>, commands: Vec<&'static str>) {
    let config = match Config::builder().history_ignore_dups(true) {
        Ok(builder) => builder
            .auto_add_history(true)
            .completion_type(CompletionType::List)
            .build(),
        Err(e) => {
            eprintln!("Failed to configure line editor: {e}");
            return;
        }
    };

    let mut rl = match Editor::with_config(config) {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to initialize line editor: {e}");
            return;
        }
    };
    rl.set_helper(Some(ReplHelper { commands }));

    let hist_path = history_path();
    if let Some(parent) = hist_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.load_history(&hist_path);

    println!("\x1b[1mopsbot\x1b[0m  try `@bot get-app`, `quit` to exit");
    println!();

    loop {
        match rl.readline("\x1b[1;36m\u{203A}\x1b[0m ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if matches!(line, "quit" | "exit") {
                    break;
                }

                let (done_tx, done_rx) = oneshot::channel();
                if tx.blocking_send((line.to_string(), done_tx)).is_err() {
                    break;
                }
                // Keep the prompt below the reply.
                let _ = done_rx.blocking_recv();
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMANDS: &[&str] = &["describe", "get-app", "get-binding", "logs", "set-app"];

    #[test]
    fn test_completes_command_after_mention() {
        let (start, matches) = complete_command("@bot get", 8, COMMANDS);
        assert_eq!(start, 5);
        assert_eq!(matches, vec!["get-app", "get-binding"]);
    }

    #[test]
    fn test_no_completion_for_mention_or_args() {
        let (_, matches) = complete_command("@bo", 3, COMMANDS);
        assert!(matches.is_empty());

        let (start, matches) = complete_command("@bot logs <@U", 13, COMMANDS);
        assert_eq!(start, 10);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_empty_command_lists_everything() {
        let (start, matches) = complete_command("@bot ", 5, COMMANDS);
        assert_eq!(start, 5);
        assert_eq!(matches.len(), COMMANDS.len());
    }
}
