//! carebot-handler - composable, self-describing message handlers
//!
//! An inbound chat message is offered to a tree of [`Handler`] nodes:
//! - leaves run an action and report whether they consumed the message
//! - filters guard a subtree with a predicate (commands, chat type, mentions)
//! - annotations attach help metadata without changing routing
//! - composites offer the message to every child, or stop at the first match
//!
//! The same tree is walked a second time by [`Handler::details`] to build the
//! `/help` text, so routes document themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! use carebot_handler::{ChatType, Handler};
//!
//! let init = Handler::act(|ctx| async move {
//!     ctx.reply("Challenge started!");
//!     Ok(())
//! })
//! .on_chat_type(ChatType::Group, true)
//! .description("Begin a group in the active room")
//! .command(&["init"]);
//!
//! let root = Handler::combine([init]).help();
//! ```

pub mod context;
pub mod details;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod help;
pub mod mock;
pub mod text;

pub use context::{Chat, ChatType, Context, Message, MessageContext, MessageEntity, User};
pub use details::HandlerDetails;
pub use dispatch::Dispatcher;
pub use error::{HandlerError, HandlerResult};
pub use handler::{Composition, Handler};
pub use help::{render_help, DEFAULT_GROUP};
pub use mock::{MockContext, Reply};
pub use text::{
    arguments, command_arguments, command_remainder, matched_command, matches_command,
    strip_command, NOTIFICATION_PREFIX,
};
