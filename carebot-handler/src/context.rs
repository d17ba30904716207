//! Inbound message data and the capability interface handlers consume.
//!
//! Handlers never construct a context; a platform adapter does, and exposes
//! the message plus fire-and-forget reply methods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl fmt::Display for ChatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatType::Private => write!(f, "private"),
            ChatType::Group => write!(f, "group"),
            ChatType::Supergroup => write!(f, "supergroup"),
            ChatType::Channel => write!(f, "channel"),
        }
    }
}

/// Chat identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatType,
}

impl Chat {
    pub fn new(id: i64, kind: ChatType) -> Self {
        Self { id, kind }
    }

    /// Private chat with a user; the chat id equals the user id.
    pub fn private(user_id: i64) -> Self {
        Self::new(user_id, ChatType::Private)
    }

    pub fn group(id: i64) -> Self {
        Self::new(id, ChatType::Group)
    }
}

/// A chat platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl User {
    pub fn new(id: i64, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: None,
            username: None,
        }
    }

    /// Set the last name.
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    /// First and last name joined by a space.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// A formatted span of the message text. Mentions carry the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// An inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: User,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
}

impl Message {
    /// Text message without entities.
    pub fn new(chat: Chat, from: User, text: impl Into<String>) -> Self {
        Self {
            chat,
            from,
            text: text.into(),
            entities: Vec::new(),
        }
    }

    /// Append a mention entity for `user`.
    pub fn with_mention(mut self, user: User) -> Self {
        self.entities.push(MessageEntity {
            kind: "text_mention".to_string(),
            user: Some(user),
        });
        self
    }

    /// Users referenced by mention entities, in message order.
    pub fn mentioned_users(&self) -> impl Iterator<Item = &User> {
        self.entities.iter().filter_map(|entity| entity.user.as_ref())
    }

    /// Whether at least one entity mentions a user.
    pub fn has_user_entities(&self) -> bool {
        self.mentioned_users().next().is_some()
    }
}

/// What a handler can see and do for one inbound message.
///
/// Reply methods do not report completion; adapters queue the outgoing
/// text and deliver it on their own schedule.
pub trait MessageContext: Send + Sync {
    /// The inbound message.
    fn message(&self) -> &Message;

    /// Reply in the same chat with plain text.
    fn reply(&self, text: &str);

    /// Reply in the same chat with Markdown.
    fn reply_with_markdown(&self, text: &str);

    /// Send Markdown to another chat.
    fn send_markdown(&self, chat_id: i64, text: &str);

    fn chat(&self) -> &Chat {
        &self.message().chat
    }

    fn sender(&self) -> &User {
        &self.message().from
    }

    fn text(&self) -> &str {
        &self.message().text
    }
}

/// Shared context handed through the handler tree.
pub type Context = Arc<dyn MessageContext>;
