//! Recording message context for tests.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::{Chat, Context, Message, MessageContext, User};

/// One outgoing message captured by [`MockContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Markdown(String),
    /// Markdown sent to another chat.
    Sent { chat_id: i64, text: String },
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Text(text) | Reply::Markdown(text) => text,
            Reply::Sent { text, .. } => text,
        }
    }
}

/// Mock context for testing.
///
/// Wraps a fixed message and records every reply in order.
pub struct MockContext {
    message: Message,
    replies: Mutex<Vec<Reply>>,
}

impl MockContext {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            replies: Mutex::new(Vec::new()),
        }
    }

    /// Plain text from `from` in `chat`.
    pub fn from_text(chat: Chat, from: User, text: impl Into<String>) -> Self {
        Self::new(Message::new(chat, from, text))
    }

    /// Share as a handler [`Context`] while keeping a handle for assertions.
    pub fn shared(self) -> (Arc<MockContext>, Context) {
        let mock = Arc::new(self);
        let ctx: Context = mock.clone();
        (mock, ctx)
    }

    /// All captured replies.
    pub fn replies(&self) -> Vec<Reply> {
        self.lock().clone()
    }

    /// Text of every captured reply.
    pub fn reply_texts(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.text().to_string()).collect()
    }

    /// Text of the most recent reply.
    pub fn last_reply(&self) -> Option<String> {
        self.lock().last().map(|r| r.text().to_string())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Reply>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, reply: Reply) {
        self.lock().push(reply);
    }
}

impl MessageContext for MockContext {
    fn message(&self) -> &Message {
        &self.message
    }

    fn reply(&self, text: &str) {
        self.record(Reply::Text(text.to_string()));
    }

    fn reply_with_markdown(&self, text: &str) {
        self.record(Reply::Markdown(text.to_string()));
    }

    fn send_markdown(&self, chat_id: i64, text: &str) {
        self.record(Reply::Sent {
            chat_id,
            text: text.to_string(),
        });
    }
}
