//! Chat transports.
//!
//! A channel turns platform events into [`IncomingMessage`]s and carries
//! replies back through a [`ReplySink`]. The dispatcher only sees these
//! two types, so Slack, the local REPL and tests are interchangeable.

pub mod fake;
pub mod repl;
pub mod slack;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ChannelError;

pub use self::fake::{RecordingSink, SentMessage};

/// An inbound chat event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Channel the message was posted in; replies go back here.
    pub channel: String,
    /// Platform user id of the sender.
    pub user: String,
    pub text: Option<String>,
    /// Platform subtype (`channel_join`, `message_changed`, ...).
    pub subtype: Option<String>,
    /// Set when another bot (or this one) posted the message.
    pub bot_id: Option<String>,
}

impl IncomingMessage {
    pub fn new(channel: impl Into<String>, user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
            text: Some(text.into()),
            subtype: None,
            bot_id: None,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_bot_id(mut self, bot_id: impl Into<String>) -> Self {
        self.bot_id = Some(bot_id.into());
        self
    }

    /// Membership changes, edits and bot posts are not commands.
    pub fn is_service(&self) -> bool {
        self.subtype.is_some() || self.bot_id.is_some()
    }
}

/// Where replies are delivered.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Channel name for logs and errors.
    fn name(&self) -> &str;

    /// Post `text` to `channel`.
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ChannelError>;
}

/// Context for a single inbound message.
pub struct Conversation {
    sink: Arc<dyn ReplySink>,
    channel: String,
    user: String,
}

impl Conversation {
    pub fn new(sink: Arc<dyn ReplySink>, channel: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            sink,
            channel: channel.into(),
            user: user.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// The sender formatted as a platform mention, `<@U123>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user)
    }

    /// Reply in the originating channel.
    pub async fn msg(&self, text: &str) -> Result<(), ChannelError> {
        self.sink.post_message(&self.channel, text).await
    }
}
