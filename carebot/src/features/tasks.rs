//! Shared task list with a two-step creation dialog.
//!
//! `/task add` opens a draft for the sender in the current chat. The next
//! message is taken as the description, the one after as the title, and the
//! task is stored under a fresh random id.

use carebot_handler::{command_arguments, Context, Handler, HandlerError, HandlerResult};
use carebot_store::{ItemStore, Serializer, Store, StoreResult};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::drafts::{DraftKey, DraftRegistry};
use crate::model::Task;

const DESCRIPTION_CHARS: std::ops::Range<usize> = 6..200;
const TITLE_CHARS: std::ops::Range<usize> = 4..36;
const MAX_TASK_ID: u32 = 100_000;
const ID_ATTEMPTS: usize = 1_000;

const REMOVE_ALIASES: [&str; 3] = ["task remove", "remove_task", "task_remove"];

/// Answers collected so far in a task creation dialog.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub description: Option<String>,
}

fn draft_key(ctx: &Context) -> DraftKey {
    DraftKey::new(ctx.chat().id, ctx.sender().id)
}

/// Random id in `1..MAX_TASK_ID` not in `taken`, giving up after
/// `ID_ATTEMPTS` draws.
fn pick_unused_id<R: Rng>(taken: &HashSet<u32>, rng: &mut R) -> Option<u32> {
    (0..ID_ATTEMPTS)
        .map(|_| rng.gen_range(1..MAX_TASK_ID))
        .find(|id| !taken.contains(id))
}

fn is_stop_word(text: &str) -> bool {
    matches!(
        text.trim().trim_start_matches('/').to_lowercase().as_str(),
        "stop" | "cancel" | "exit"
    )
}

#[derive(Clone)]
pub struct Tasks {
    ids: ItemStore<Vec<u32>>,
    tasks: Store<u32, Task>,
    drafts: Arc<DraftRegistry<TaskDraft>>,
}

impl Tasks {
    /// Tasks stored as `tasks/item/<id>`, with their ids listed at `tasks/ids`.
    pub fn new(root: &Store<String, String>, draft_ttl: Duration) -> Self {
        let scope = root.scope("tasks");
        let ids = scope
            .item("ids".to_string())
            .contramap(Serializer::json_array())
            .default(Vec::new());
        let tasks = scope
            .scope("item")
            .transform_key(|id: &u32| id.to_string())
            .contramap_value(Serializer::json())
            .track_keys(ids.clone());

        Self {
            ids,
            tasks,
            drafts: Arc::new(DraftRegistry::new(draft_ttl)),
        }
    }

    pub fn drafts(&self) -> &Arc<DraftRegistry<TaskDraft>> {
        &self.drafts
    }

    /// Ids of every stored task, in creation order.
    pub async fn ids(&self) -> StoreResult<Vec<u32>> {
        Ok(self.ids.get().await?.unwrap_or_default())
    }

    /// Tasks for `ids` ordered by id, skipping ids with no task.
    pub async fn get_many(&self, ids: &[u32]) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .get_many(ids)
            .await?
            .into_iter()
            .map(|(_, task)| task)
            .collect();
        tasks.sort_by_key(|task| task.id);
        Ok(tasks)
    }

    /// Every stored task, ordered by id.
    pub async fn list(&self) -> StoreResult<Vec<Task>> {
        let ids = self.ids().await?;
        self.get_many(&ids).await
    }

    async fn unused_id(&self) -> HandlerResult<u32> {
        let taken: HashSet<u32> = self.ids().await?.into_iter().collect();
        pick_unused_id(&taken, &mut rand::thread_rng())
            .ok_or_else(|| HandlerError::Action("no free task id left".to_string()))
    }

    pub fn handler(&self) -> Handler {
        Handler::first_only([
            Handler::combine([self.list_tasks(), self.add_task(), self.remove_task()]),
            self.cancel_draft(),
            self.awaiting_input(),
        ])
        .group("Tasks")
    }

    fn list_tasks(&self) -> Handler {
        let tasks = self.clone();
        Handler::act(move |ctx| {
            let tasks = tasks.clone();
            async move {
                let all = tasks.list().await?;
                if all.is_empty() {
                    ctx.reply_with_markdown("There are no tasks. Add one now with */task add*");
                } else {
                    let lines: Vec<String> = all.iter().map(Task::render).collect();
                    ctx.reply_with_markdown(&lines.join("\n"));
                }
                Ok(())
            }
        })
        .description("List all tasks")
        .command(&["tasks", "task list"])
    }

    fn add_task(&self) -> Handler {
        let drafts = self.drafts.clone();
        Handler::act(move |ctx| {
            let drafts = drafts.clone();
            async move {
                drafts.insert(draft_key(&ctx), TaskDraft::default());
                ctx.reply_with_markdown("What's the description of the task? _(6 - 199 chars)_");
                Ok(())
            }
        })
        .description("Create a new task")
        .command(&["task add", "add_task", "task_add"])
    }

    fn remove_task(&self) -> Handler {
        let tasks = self.tasks.clone();
        Handler::act(move |ctx| {
            let tasks = tasks.clone();
            async move {
                let Some(id) = command_arguments(ctx.text(), &REMOVE_ALIASES)
                    .first()
                    .and_then(|arg| arg.parse::<u32>().ok())
                else {
                    ctx.reply_with_markdown("Try again with a numeric task ID");
                    return Ok(());
                };

                match tasks.get(&id).await? {
                    Some(task) => {
                        tasks.remove(&id).await?;
                        info!("Task {} deleted", id);
                        ctx.reply_with_markdown(&format!("Task *{}* deleted", task.title));
                    }
                    None => ctx.reply_with_markdown(&format!("No task with ID {}", id)),
                }
                Ok(())
            }
        })
        .with_argument_count(1, Some("Try again with the ID of the task to remove"))
        .description("Delete a task by ID")
        .command(&REMOVE_ALIASES)
    }

    fn cancel_draft(&self) -> Handler {
        let drafts = self.drafts.clone();
        let open = self.drafts.clone();
        Handler::act(move |ctx| {
            let drafts = drafts.clone();
            async move {
                drafts.remove(&draft_key(&ctx));
                ctx.reply("Task creation cancelled.");
                Ok(())
            }
        })
        .filter(move |ctx| is_stop_word(ctx.text()) && open.contains(&draft_key(ctx)))
    }

    fn awaiting_input(&self) -> Handler {
        let tasks = self.clone();
        let open = self.drafts.clone();
        Handler::act(move |ctx| {
            let tasks = tasks.clone();
            async move { tasks.continue_draft(&ctx).await }
        })
        .filter(move |ctx| open.contains(&draft_key(ctx)))
    }

    async fn continue_draft(&self, ctx: &Context) -> HandlerResult<()> {
        let key = draft_key(ctx);
        let Some(draft) = self.drafts.get(&key) else {
            return Ok(());
        };
        let input = ctx.text().trim();
        let length = input.chars().count();

        match draft.description {
            None if DESCRIPTION_CHARS.contains(&length) => {
                self.drafts.insert(
                    key,
                    TaskDraft {
                        description: Some(input.to_string()),
                    },
                );
                ctx.reply_with_markdown(
                    "Great. What would you like to title this task? _(4 - 35 chars)_",
                );
            }
            None => {
                ctx.reply_with_markdown("Please enter a description between _(6 - 199) chars_");
            }
            Some(description) if TITLE_CHARS.contains(&length) => {
                self.drafts.remove(&key);
                let id = match self.unused_id().await {
                    Ok(id) => id,
                    Err(e) => {
                        ctx.reply_with_markdown(
                            "The task list is full. Remove a task and try again.",
                        );
                        return Err(e);
                    }
                };
                let task = Task {
                    id,
                    title: input.to_string(),
                    description,
                };
                self.tasks.insert(&id, task).await?;
                info!("Task {} created in chat {}", id, key.chat_id);
                ctx.reply_with_markdown(&format!("Your task has been added as ID: {}", id));
            }
            Some(_) => {
                ctx.reply_with_markdown("Please enter a title between _(4 - 35) chars_");
            }
        }
        Ok(())
    }
}
