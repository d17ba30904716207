//! Wires every feature into one handler tree.

use carebot_handler::{Dispatcher, Handler};
use carebot_store::{Serializer, Store, StoreResult};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::features::{Challenges, FeedbackBox, Groups, Karma, Tasks};
use crate::model::UserProfile;

/// The assembled bot.
#[derive(Clone)]
pub struct CareBot {
    groups: Groups,
    tasks: Tasks,
    root: Handler,
}

impl CareBot {
    /// Build all features over `store`, scoped into the configured namespace.
    ///
    /// Keys: `chat_ids`, `groups/<chat>/members`, `users/<id>`, `tasks/ids`,
    /// `tasks/item/<id>`, `active_challenges` and `feedback`.
    pub fn build(store: Store<String, String>, config: &Config) -> Self {
        let root = store.scope(&config.bot.namespace);
        let profiles = root
            .scope("users")
            .transform_key(|id: &i64| id.to_string())
            .contramap_value(Serializer::json())
            .default(|id: &i64| UserProfile::new(*id));

        let groups = Groups::new(&root, profiles.clone());
        let karma = Karma::new(profiles.clone());
        let tasks = Tasks::new(&root, config.draft_ttl());
        let challenges = Challenges::new(&root, tasks.clone(), profiles);
        let feedback = FeedbackBox::new(&root);

        let handler = Handler::combine([
            groups.handler(),
            karma.handler(),
            tasks.handler(),
            challenges.handler(),
            feedback.handler(),
        ])
        .help();

        Self {
            groups,
            tasks,
            root: handler,
        }
    }

    /// Load registered groups before the first message arrives.
    pub async fn start(&self) -> StoreResult<()> {
        self.groups.load().await?;
        info!("Bot started with {} group(s)", self.groups.registry().len());
        Ok(())
    }

    pub fn handler(&self) -> &Handler {
        &self.root
    }

    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    pub fn tasks(&self) -> &Tasks {
        &self.tasks
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.root.clone())
    }

    /// Periodically drop expired task drafts.
    pub fn spawn_draft_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let drafts = self.tasks.drafts().clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                drafts.purge_expired();
            }
        })
    }
}
