//! Karma: `@someone ++` or `@someone --` adjusts the mentioned users' karma
//! in the current chat.

use carebot_handler::{Context, Handler, User};
use carebot_store::Store;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::model::UserProfile;

const CONGRATULATIONS: &[&str] = &["Nice!", "Hell yeah!", "Woohoo!", "Dope!", "Nailed it.", "Aw yeah."];
const CONSOLATIONS: &[&str] = &["Ouch.", "Dang.", "Harsh.", "Oh snap.", "Dramaaaaa."];

/// Direction requested by the end of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KarmaChange {
    Up,
    Down,
}

impl KarmaChange {
    /// `++` raises; `--` or an em dash (what some keyboards turn `--` into)
    /// lowers.
    pub fn detect(text: &str) -> Option<Self> {
        let text = text.trim_end();
        if text.ends_with("++") {
            Some(KarmaChange::Up)
        } else if text.ends_with("--") || text.ends_with('\u{2014}') {
            Some(KarmaChange::Down)
        } else {
            None
        }
    }

    pub fn delta(self) -> i64 {
        match self {
            KarmaChange::Up => 1,
            KarmaChange::Down => -1,
        }
    }

    fn announce(self, profile: &UserProfile) -> String {
        let mut rng = rand::thread_rng();
        match self {
            KarmaChange::Up => format!(
                "{} {} has {} karma!",
                CONGRATULATIONS.choose(&mut rng).unwrap_or(&"Nice!"),
                profile.display_name(),
                profile.global_karma()
            ),
            KarmaChange::Down => format!(
                "{} {} has {} karma.",
                CONSOLATIONS.choose(&mut rng).unwrap_or(&"Ouch."),
                profile.display_name(),
                profile.global_karma()
            ),
        }
    }
}

/// Mentioned users other than the sender.
fn recipients(ctx: &Context) -> Vec<User> {
    let sender = ctx.sender().id;
    ctx.message()
        .mentioned_users()
        .filter(|user| user.id != sender)
        .cloned()
        .collect()
}

#[derive(Clone)]
pub struct Karma {
    profiles: Store<i64, UserProfile>,
}

impl Karma {
    pub fn new(profiles: Store<i64, UserProfile>) -> Self {
        Self { profiles }
    }

    pub fn handler(&self) -> Handler {
        Handler::combine([
            self.modifier(KarmaChange::Up)
                .name("@user ++")
                .description("Give karma to the mentioned users"),
            self.modifier(KarmaChange::Down)
                .name("@user --")
                .description("Take karma from the mentioned users"),
        ])
        .group("Karma")
    }

    fn modifier(&self, change: KarmaChange) -> Handler {
        let profiles = self.profiles.clone();
        Handler::create(move |ctx| {
            let profiles = profiles.clone();
            async move {
                let users = recipients(&ctx);
                if users.is_empty() {
                    return Ok(false);
                }
                let chat_id = ctx.chat().id;
                for user in &users {
                    let profile = profiles
                        .modify(&user.id, |profile| {
                            profile.updated_from(user).with_karma(change.delta(), chat_id)
                        })
                        .await?;
                    debug!(
                        "Karma for {} is now {} in chat {}",
                        user.id,
                        profile.room_karma.get(&chat_id).copied().unwrap_or_default(),
                        chat_id
                    );
                    ctx.reply(&change.announce(&profile));
                }
                Ok(true)
            }
        })
        .filter(move |ctx| KarmaChange::detect(ctx.text()) == Some(change))
    }
}
