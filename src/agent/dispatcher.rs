//! Routes one inbound message to a command and sends the reply.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::agent::commands::{Command, CommandContext, builtin_commands, welcome_text};
use crate::agent::router::parse_command_line;
use crate::channels::{Conversation, IncomingMessage, ReplySink};
use crate::cluster::Locator;
use crate::db::BindingStore;
use crate::error::{ChannelError, CommandErrorKind};

/// What the dispatcher did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Service event, missing or blank text. Nothing sent.
    Ignored,
    /// Mention only, or an unknown command. Welcome text sent.
    Welcome,
    /// Command succeeded; `replied` is false when its output was empty.
    Completed { command: String, replied: bool },
    /// Command failed; the error text was sent as the reply.
    Failed {
        command: String,
        kind: CommandErrorKind,
    },
}

/// Command table plus the single-message-at-a-time guard.
pub struct Dispatcher {
    commands: BTreeMap<&'static str, Arc<dyn Command>>,
    processing: Mutex<()>,
}

impl Dispatcher {
    /// Dispatcher with no commands; every message gets the welcome text.
    pub fn empty() -> Self {
        Self {
            commands: BTreeMap::new(),
            processing: Mutex::new(()),
        }
    }

    /// Dispatcher with the built-in commands over `store` and `locator`.
    pub fn new(store: Arc<dyn BindingStore>, locator: Locator) -> Self {
        let ctx = Arc::new(CommandContext::new(store, locator));
        let mut dispatcher = Self::empty();
        for command in builtin_commands(ctx) {
            dispatcher.register(command);
        }
        dispatcher
    }

    /// Add a command under its name and aliases, replacing any previous owner.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name(), Arc::clone(&command));
        for &alias in command.aliases() {
            self.commands.insert(alias, Arc::clone(&command));
        }
    }

    /// Every accepted command name, sorted.
    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    /// Handle one message to completion, replying through `sink`.
    ///
    /// Only a failure to deliver the reply is returned as an error; command
    /// failures become reply text.
    pub async fn handle(
        &self,
        message: &IncomingMessage,
        sink: Arc<dyn ReplySink>,
    ) -> Result<DispatchOutcome, ChannelError> {
        if message.is_service() {
            tracing::debug!(channel = %message.channel, subtype = ?message.subtype, "ignoring service event");
            return Ok(DispatchOutcome::Ignored);
        }
        let Some(line) = message.text.as_deref().and_then(parse_command_line) else {
            return Ok(DispatchOutcome::Ignored);
        };

        let _processing = self.processing.lock().await;
        let conv = Conversation::new(sink, message.channel.as_str(), message.user.as_str());

        let Some(name) = line.command.as_deref() else {
            conv.msg(&welcome_text(conv.user(), &line.me)).await?;
            return Ok(DispatchOutcome::Welcome);
        };
        let Some(command) = self.commands.get(name) else {
            tracing::debug!(command = name, "unknown command");
            conv.msg(&welcome_text(conv.user(), &line.me)).await?;
            return Ok(DispatchOutcome::Welcome);
        };

        tracing::info!(command = name, user = %message.user, args = ?line.args, "received command");
        match command.execute(&conv, &line.args).await {
            Ok(reply) if reply.is_empty() => Ok(DispatchOutcome::Completed {
                command: name.to_string(),
                replied: false,
            }),
            Ok(reply) => {
                conv.msg(&reply).await?;
                Ok(DispatchOutcome::Completed {
                    command: name.to_string(),
                    replied: true,
                })
            }
            Err(e) => {
                let kind = e.kind();
                tracing::debug!(command = name, ?kind, error = %e, "command failed");
                conv.msg(&e.to_string()).await?;
                Ok(DispatchOutcome::Failed {
                    command: name.to_string(),
                    kind,
                })
            }
        }
    }
}
