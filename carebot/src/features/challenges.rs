//! Active challenges drawn from the shared task list.
//!
//! The active list at `active_challenges` holds task ids. Ids are checked
//! against the task list when they are set or added; a task deleted later
//! simply drops out of the replies.

use carebot_handler::{arguments, Context, Handler, HandlerResult};
use carebot_store::{ItemStore, Serializer, Store, StoreResult};
use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::info;

use crate::features::Tasks;
use crate::model::{Task, UserProfile};

/// Task ids among the command arguments, in order, without repeats.
fn requested_ids(ctx: &Context) -> Vec<u32> {
    let mut ids = Vec::new();
    for id in arguments(ctx.text()).iter().filter_map(|arg| arg.parse::<u32>().ok()) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn render_challenges(heading: &str, tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return format!("{} No challenges.", heading);
    }
    let lines: Vec<String> = tasks.iter().map(Task::render).collect();
    format!("{}\n{}", heading, lines.join("\n"))
}

#[derive(Clone)]
pub struct Challenges {
    tasks: Tasks,
    active: ItemStore<Vec<u32>>,
    profiles: Store<i64, UserProfile>,
}

impl Challenges {
    pub fn new(
        root: &Store<String, String>,
        tasks: Tasks,
        profiles: Store<i64, UserProfile>,
    ) -> Self {
        let active = root
            .item("active_challenges".to_string())
            .contramap(Serializer::json_array())
            .default(Vec::new());
        Self {
            tasks,
            active,
            profiles,
        }
    }

    /// Tasks currently set as challenges, ordered by id.
    pub async fn active(&self) -> StoreResult<Vec<Task>> {
        let ids = self.active.get().await?.unwrap_or_default();
        self.tasks.get_many(&ids).await
    }

    /// Of `ids`, those that name a stored task.
    async fn known(&self, ids: Vec<u32>) -> StoreResult<Vec<u32>> {
        let stored = self.tasks.ids().await?;
        Ok(ids.into_iter().filter(|id| stored.contains(id)).collect())
    }

    async fn reply_with_active(&self, ctx: &Context, heading: &str) -> HandlerResult<()> {
        let tasks = self.active().await?;
        ctx.reply_with_markdown(&render_challenges(heading, &tasks));
        Ok(())
    }

    pub fn handler(&self) -> Handler {
        Handler::combine([
            self.set_random(),
            self.set(),
            self.add(),
            self.clear(),
            self.list(),
            self.complete(),
        ])
        .group("Challenges")
    }

    fn set_random(&self) -> Handler {
        let challenges = self.clone();
        Handler::act(move |ctx| {
            let challenges = challenges.clone();
            async move {
                let Some(count) = arguments(ctx.text())
                    .first()
                    .and_then(|arg| arg.parse::<usize>().ok())
                else {
                    ctx.reply_with_markdown("Try again with # of challenges you'd like to set");
                    return Ok(());
                };

                let mut ids = challenges.tasks.ids().await?;
                ids.shuffle(&mut rand::thread_rng());
                ids.truncate(count);
                challenges.active.insert(ids).await?;
                info!("Set {} random challenge(s)", count);
                challenges.reply_with_active(&ctx, "Random challenges set!").await
            }
        })
        .with_argument_count(1, Some("Try again with # of challenges you'd like to set"))
        .description("Randomly select and set n challenges")
        .command(&["setrandomchallenges"])
    }

    fn set(&self) -> Handler {
        let challenges = self.clone();
        Handler::act(move |ctx| {
            let challenges = challenges.clone();
            async move {
                let ids = challenges.known(requested_ids(&ctx)).await?;
                challenges.active.insert(ids).await?;
                challenges.reply_with_active(&ctx, "Challenges set!").await
            }
        })
        .with_argument_count(1, Some("Try again with the task IDs to set as challenges"))
        .description("Clear and set the list of challenges to the given task IDs")
        .command(&["setchallenge"])
    }

    fn add(&self) -> Handler {
        let challenges = self.clone();
        Handler::act(move |ctx| {
            let challenges = challenges.clone();
            async move {
                let added = challenges.known(requested_ids(&ctx)).await?;
                challenges
                    .active
                    .modify(|mut ids| {
                        for id in added {
                            if !ids.contains(&id) {
                                ids.push(id);
                            }
                        }
                        ids
                    })
                    .await?;
                challenges.reply_with_active(&ctx, "Challenges added!").await
            }
        })
        .with_argument_count(1, Some("Try again with the task IDs to add as challenges"))
        .description("Add a comma delimited list of task IDs as challenges")
        .command(&["addchallenge"])
    }

    fn clear(&self) -> Handler {
        let active = self.active.clone();
        Handler::act(move |ctx| {
            let active = active.clone();
            async move {
                active.insert(Vec::new()).await?;
                ctx.reply_with_markdown("Active challenges cleared.");
                Ok(())
            }
        })
        .description("Clear active challenges")
        .command(&["clearchallenges"])
    }

    fn list(&self) -> Handler {
        let challenges = self.clone();
        Handler::act(move |ctx| {
            let challenges = challenges.clone();
            async move { challenges.reply_with_active(&ctx, "Current challenges:").await }
        })
        .description("List all the active challenges")
        .command(&["challenges"])
    }

    /// Record an active challenge as done on the sender's profile.
    fn complete(&self) -> Handler {
        let challenges = self.clone();
        Handler::act(move |ctx| {
            let challenges = challenges.clone();
            async move {
                let Some(id) = requested_ids(&ctx).first().copied() else {
                    ctx.reply_with_markdown("Try again with a numeric task ID");
                    return Ok(());
                };
                let Some(task) = challenges.active().await?.into_iter().find(|t| t.id == id)
                else {
                    ctx.reply_with_markdown(&format!("Task {} is not an active challenge", id));
                    return Ok(());
                };

                let sender = ctx.sender().clone();
                let mut repeat = false;
                challenges
                    .profiles
                    .modify(&sender.id, |profile| {
                        repeat = profile.has_completed(id);
                        profile
                            .updated_from(&sender)
                            .with_completed_task(id, Utc::now())
                    })
                    .await?;

                if repeat {
                    ctx.reply_with_markdown(&format!("You already completed *{}*", task.title));
                } else {
                    info!("User {} completed challenge {}", sender.id, id);
                    ctx.reply_with_markdown(&format!("Well done! *{}* completed", task.title));
                }
                Ok(())
            }
        })
        .with_argument_count(1, Some("Try again with the ID of the challenge you completed"))
        .description("Record an active challenge as completed")
        .command(&["completetask"])
    }
}
