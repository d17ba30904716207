//! Stored records.

use carebot_handler::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the bot remembers about a chat user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Karma per chat id
    #[serde(default)]
    pub room_karma: BTreeMap<i64, i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks_completed: Vec<TaskEvent>,
}

/// A task a user reported as done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub task_id: u32,
    pub completed_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: String::new(),
            room_karma: BTreeMap::new(),
            tasks_completed: Vec::new(),
        }
    }

    /// Refresh the display name from platform data.
    pub fn updated_from(mut self, user: &User) -> Self {
        self.name = user.full_name();
        self
    }

    /// Add `delta` to the karma earned in `chat_id`.
    pub fn with_karma(mut self, delta: i64, chat_id: i64) -> Self {
        *self.room_karma.entry(chat_id).or_insert(0) += delta;
        self
    }

    pub fn has_completed(&self, task_id: u32) -> bool {
        self.tasks_completed.iter().any(|event| event.task_id == task_id)
    }

    /// Record `task_id` as done at `at`. A task is recorded at most once;
    /// later completions keep the first timestamp.
    pub fn with_completed_task(mut self, task_id: u32, at: DateTime<Utc>) -> Self {
        if !self.has_completed(task_id) {
            self.tasks_completed.push(TaskEvent {
                task_id,
                completed_at: at,
            });
        }
        self
    }

    /// Karma summed over every chat.
    pub fn global_karma(&self) -> i64 {
        self.room_karma.values().sum()
    }

    /// Name for display, falling back to the id.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("user {}", self.id)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub title: String,
    pub description: String,
}

impl Task {
    /// Markdown list line, e.g. `[12] *Call grandma* - Sunday evening`.
    pub fn render(&self) -> String {
        format!("[{}] *{}* - {}", self.id, self.title, self.description)
    }
}

/// Anonymous feedback entry. The author is kept only to reject repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub user_id: i64,
    pub date: DateTime<Utc>,
    pub message: String,
}
