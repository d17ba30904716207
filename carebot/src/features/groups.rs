//! Group challenges.
//!
//! `/init` in a group chat registers it in the `chat_ids` list. Every
//! registered chat gets a [`GroupRoom`] with its own member list. Room
//! commands reach a room when they are sent in its chat, or by one of its
//! members from anywhere (typically a private chat with the bot).

use carebot_handler::{strip_command, ChatType, Context, Handler, HandlerResult, User};
use carebot_store::{ItemStore, Serializer, Store, StoreResult};
use dashmap::DashMap;
use futures::future::try_join_all;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::model::UserProfile;

/// One registered group chat.
pub struct GroupRoom {
    chat_id: i64,
    members: ItemStore<Vec<i64>>,
    member_cache: Arc<RwLock<Vec<i64>>>,
    loaded: OnceCell<()>,
}

impl GroupRoom {
    /// Room whose member list lives at `members` inside `store`.
    pub fn new(chat_id: i64, store: &Store<String, String>) -> Self {
        let member_cache = Arc::new(RwLock::new(Vec::new()));
        let mirror = member_cache.clone();
        let members = store
            .item("members".to_string())
            .contramap(Serializer::json_array())
            .default(Vec::new())
            .on_update(move |ids: Option<&Vec<i64>>| {
                if let Some(ids) = ids {
                    *mirror.write().unwrap_or_else(PoisonError::into_inner) = ids.clone();
                }
            });

        Self {
            chat_id,
            members,
            member_cache,
            loaded: OnceCell::new(),
        }
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Member ids as last read from or written to the store.
    pub fn member_ids(&self) -> Vec<i64> {
        self.member_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_member(&self, user_id: i64) -> bool {
        self.member_ids().contains(&user_id)
    }

    /// Read the member list once so the cache is populated.
    pub async fn ensure_loaded(&self) -> StoreResult<()> {
        self.loaded
            .get_or_try_init(|| async { self.members.get().await.map(|_| ()) })
            .await?;
        Ok(())
    }

    /// Add ids not already present, keeping existing order.
    pub async fn add_members(&self, ids: &[i64]) -> StoreResult<Vec<i64>> {
        self.members
            .modify(|mut members| {
                for id in ids {
                    if !members.contains(id) {
                        members.push(*id);
                    }
                }
                members
            })
            .await
    }

    pub async fn remove_member(&self, id: i64) -> StoreResult<Vec<i64>> {
        self.members
            .modify(|mut members| {
                members.retain(|member| *member != id);
                members
            })
            .await
    }
}

type RoomFactory = Box<dyn Fn(i64) -> GroupRoom + Send + Sync>;

/// Chat id to room map, filled from the `chat_ids` list.
pub struct GroupRegistry {
    rooms: DashMap<i64, Arc<GroupRoom>>,
    factory: RoomFactory,
}

impl GroupRegistry {
    pub fn new(factory: impl Fn(i64) -> GroupRoom + Send + Sync + 'static) -> Self {
        Self {
            rooms: DashMap::new(),
            factory: Box::new(factory),
        }
    }

    /// Create rooms for ids without one. Returns how many were created.
    pub fn sync(&self, chat_ids: &[i64]) -> usize {
        let mut created = 0;
        for chat_id in chat_ids {
            self.rooms.entry(*chat_id).or_insert_with(|| {
                info!("Setting up group room for chat {}", chat_id);
                created += 1;
                Arc::new((self.factory)(*chat_id))
            });
        }
        created
    }

    pub fn room(&self, chat_id: i64) -> Option<Arc<GroupRoom>> {
        self.rooms.get(&chat_id).map(|room| Arc::clone(room.value()))
    }

    /// All rooms, ordered by chat id.
    pub fn rooms(&self) -> Vec<Arc<GroupRoom>> {
        let mut rooms: Vec<_> = self.rooms.iter().map(|room| Arc::clone(room.value())).collect();
        rooms.sort_by_key(|room| room.chat_id);
        rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Group registration and room commands.
#[derive(Clone)]
pub struct Groups {
    chat_ids: ItemStore<Vec<i64>>,
    registry: Arc<GroupRegistry>,
    profiles: Store<i64, UserProfile>,
    loaded: Arc<OnceCell<()>>,
}

impl Groups {
    pub fn new(root: &Store<String, String>, profiles: Store<i64, UserProfile>) -> Self {
        let rooms_root = root.scope("groups");
        let registry = Arc::new(GroupRegistry::new(move |chat_id| {
            GroupRoom::new(chat_id, &rooms_root.scope(&chat_id.to_string()))
        }));

        let mirror = registry.clone();
        let chat_ids = root
            .item("chat_ids".to_string())
            .contramap(Serializer::json_array())
            .default(Vec::new())
            .on_update(move |ids: Option<&Vec<i64>>| {
                if let Some(ids) = ids {
                    mirror.sync(ids);
                }
            });

        Self {
            chat_ids,
            registry,
            profiles,
            loaded: Arc::new(OnceCell::new()),
        }
    }

    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }

    /// Read the chat id list once, creating a room for every known chat.
    pub async fn load(&self) -> StoreResult<()> {
        self.loaded
            .get_or_try_init(|| async { self.chat_ids.get().await.map(|_| ()) })
            .await?;
        Ok(())
    }

    /// Rooms a message from `ctx` is forwarded to.
    pub async fn routed_rooms(&self, ctx: &Context) -> StoreResult<Vec<Arc<GroupRoom>>> {
        self.load().await?;
        let chat_id = ctx.chat().id;
        let sender = ctx.sender().id;

        let mut routed = Vec::new();
        for room in self.registry.rooms() {
            room.ensure_loaded().await?;
            if room.chat_id() == chat_id || room.is_member(sender) {
                debug!("Dispatching to group {}", room.chat_id());
                routed.push(room);
            }
        }
        Ok(routed)
    }

    pub fn handler(&self) -> Handler {
        Handler::combine([
            self.init(),
            self.add_members(),
            self.notify(),
            self.remove_member(),
            self.list_members(),
        ])
        .group("Groups")
    }

    fn init(&self) -> Handler {
        let chat_ids = self.chat_ids.clone();
        Handler::act(move |ctx| {
            let chat_ids = chat_ids.clone();
            async move {
                let chat_id = ctx.chat().id;
                let mut created = false;
                chat_ids
                    .modify(|mut ids| {
                        if !ids.contains(&chat_id) {
                            ids.push(chat_id);
                            created = true;
                        }
                        ids
                    })
                    .await?;

                if created {
                    info!("Group challenge started in chat {}", chat_id);
                    ctx.reply("Actively caring challenge has commenced!");
                } else {
                    ctx.reply("Challenge already under way.");
                }
                Ok(())
            }
        })
        .on_chat_type(ChatType::Group, true)
        .description("Begin a group in the active room")
        .command(&["init"])
    }

    /// Run `action` once for every room the message is routed to.
    ///
    /// Accepts only when at least one room was reached.
    fn per_room<F, Fut>(&self, action: F) -> Handler
    where
        F: Fn(Arc<GroupRoom>, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        let groups = self.clone();
        let action = Arc::new(action);
        Handler::create(move |ctx| {
            let groups = groups.clone();
            let action = action.clone();
            async move {
                let rooms = groups.routed_rooms(&ctx).await?;
                for room in &rooms {
                    action(room.clone(), ctx.clone()).await?;
                }
                Ok(!rooms.is_empty())
            }
        })
    }

    fn add_members(&self) -> Handler {
        let profiles = self.profiles.clone();
        self.per_room(move |room, ctx| {
            let profiles = profiles.clone();
            async move {
                let users: Vec<User> = ctx.message().mentioned_users().cloned().collect();
                let ids: Vec<i64> = users.iter().map(|user| user.id).collect();
                room.add_members(&ids).await?;
                try_join_all(
                    users
                        .iter()
                        .map(|user| profiles.modify(&user.id, |p| p.updated_from(user))),
                )
                .await?;

                let names: Vec<String> = users
                    .iter()
                    .map(|user| format!("*{}*", user.full_name()))
                    .collect();
                ctx.reply_with_markdown(&format!("Added {}", names.join(", ")));
                Ok(())
            }
        })
        .has_user_entities(true)
        .description("Add the mentioned users to your group")
        .command(&["add", "user add"])
    }

    fn notify(&self) -> Handler {
        self.per_room(|room, ctx| async move {
            let text = format!("*[!!]* {}", strip_command(ctx.text()));
            ctx.send_markdown(room.chat_id(), &text);
            Ok(())
        })
        .on_chat_type(ChatType::Private, false)
        .description("Send a message to your group")
        .command(&["notify"])
    }

    fn remove_member(&self) -> Handler {
        self.per_room(|room, ctx| async move {
            let Some(user) = ctx.message().mentioned_users().last().cloned() else {
                return Ok(());
            };
            room.remove_member(user.id).await?;
            ctx.reply(&format!("Removed {}", user.first_name));
            Ok(())
        })
        .has_user_entities(true)
        .description("Remove the mentioned user from your group")
        .command(&["remove", "user remove"])
    }

    fn list_members(&self) -> Handler {
        let profiles = self.profiles.clone();
        self.per_room(move |room, ctx| {
            let profiles = profiles.clone();
            async move {
                let ids = room.member_ids();
                if ids.is_empty() {
                    ctx.reply_with_markdown("No members yet. Add some with */add*");
                    return Ok(());
                }
                let lines: Vec<String> = profiles
                    .get_many(&ids)
                    .await?
                    .into_iter()
                    .map(|(_, profile)| {
                        format!(
                            "*{}* _({} karma)_",
                            profile.display_name(),
                            profile.global_karma()
                        )
                    })
                    .collect();
                ctx.reply_with_markdown(&lines.join("\n"));
                Ok(())
            }
        })
        .description("List group members and their karma")
        .command(&["members"])
    }
}
