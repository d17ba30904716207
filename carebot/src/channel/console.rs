//! JSON lines over stdin and stdout.
//!
//! Each input line is one platform `Message`. Each reply is written as one
//! [`Outgoing`] JSON object per line. Messages are handled one at a time, so
//! replies appear in input order.

use carebot_handler::{Context, Dispatcher, Message, MessageContext};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::BotResult;

/// A reply produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outgoing {
    pub chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub markdown: bool,
    pub text: String,
}

/// Message context that queues replies for the console writer.
pub struct ConsoleContext {
    message: Message,
    username: Option<String>,
    outbox: mpsc::UnboundedSender<Outgoing>,
}

impl ConsoleContext {
    pub fn new(
        message: Message,
        username: Option<String>,
        outbox: mpsc::UnboundedSender<Outgoing>,
    ) -> Self {
        Self {
            message,
            username,
            outbox,
        }
    }

    fn push(&self, chat_id: i64, markdown: bool, text: &str) {
        let outgoing = Outgoing {
            chat_id,
            from: self.username.clone(),
            markdown,
            text: text.to_string(),
        };
        if self.outbox.send(outgoing).is_err() {
            warn!("Console output closed, dropping reply to chat {}", chat_id);
        }
    }
}

impl MessageContext for ConsoleContext {
    fn message(&self) -> &Message {
        &self.message
    }

    fn reply(&self, text: &str) {
        self.push(self.message.chat.id, false, text);
    }

    fn reply_with_markdown(&self, text: &str) {
        self.push(self.message.chat.id, true, text);
    }

    fn send_markdown(&self, chat_id: i64, text: &str) {
        self.push(chat_id, true, text);
    }
}

/// Console adapter around a [`Dispatcher`].
pub struct ConsoleChannel {
    dispatcher: Dispatcher,
    username: Option<String>,
}

impl ConsoleChannel {
    pub fn new(dispatcher: Dispatcher, username: Option<String>) -> Self {
        Self {
            dispatcher,
            username,
        }
    }

    /// Handle every line of `input`, writing replies to `output`.
    ///
    /// Malformed lines are logged and skipped. Returns the number of
    /// messages some handler accepted.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> BotResult<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (outbox, mut replies) = mpsc::unbounded_channel();
        let mut lines = input.lines();
        let mut accepted = 0;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let message: Message = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Skipping malformed message: {}", e);
                    continue;
                }
            };

            let ctx: Context = Arc::new(ConsoleContext::new(
                message,
                self.username.clone(),
                outbox.clone(),
            ));
            match self.dispatcher.dispatch(ctx).await {
                Ok(true) => accepted += 1,
                Ok(false) => {}
                Err(e) => error!("Dispatch task failed: {}", e),
            }

            while let Ok(reply) = replies.try_recv() {
                Self::write(&mut output, &reply).await?;
            }
        }

        output.flush().await?;
        debug!("Console input closed after {} accepted message(s)", accepted);
        Ok(accepted)
    }

    async fn write<W: AsyncWrite + Unpin>(output: &mut W, reply: &Outgoing) -> BotResult<()> {
        let mut line = serde_json::to_string(reply).map_err(std::io::Error::from)?;
        line.push('\n');
        output.write_all(line.as_bytes()).await?;
        Ok(())
    }
}
