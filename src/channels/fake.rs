//! Recording reply sink for testing

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::channels::ReplySink;
use crate::error::ChannelError;

/// Recorded reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: String,
    pub text: String,
}

/// Sink that keeps every reply in memory
#[derive(Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded replies
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Text of the most recent reply.
    pub fn last_text(&self) -> Option<String> {
        self.sent.lock().last().map(|m| m.text.clone())
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ChannelError> {
        self.sent.lock().push(SentMessage {
            channel: channel.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}
