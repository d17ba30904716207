//! carebot - a caring challenge chat bot
//!
//! Groups register with `/init`, members are added with `/add @user`, and
//! everyone can trade karma, keep a shared task list and leave anonymous
//! feedback. All state lives in a key-value store behind
//! [`carebot_store::Store`]; routing is one [`carebot_handler::Handler`]
//! tree with a generated `/help`.

pub mod bot;
pub mod channel;
pub mod config;
pub mod drafts;
pub mod error;
pub mod features;
pub mod model;

pub use bot::CareBot;
pub use config::{BackendKind, Cli, Config};
pub use error::{BotError, BotResult};
