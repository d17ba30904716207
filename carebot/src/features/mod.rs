//! Bot features, each contributing one subtree of the root handler.

pub mod challenges;
pub mod feedback;
pub mod groups;
pub mod karma;
pub mod tasks;

pub use challenges::Challenges;
pub use feedback::FeedbackBox;
pub use groups::{GroupRegistry, GroupRoom, Groups};
pub use karma::{Karma, KarmaChange};
pub use tasks::{TaskDraft, Tasks};
