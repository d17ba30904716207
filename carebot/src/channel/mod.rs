//! Platform adapters feeding messages into the bot.

pub mod console;

pub use console::{ConsoleChannel, ConsoleContext, Outgoing};
