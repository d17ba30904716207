//! Anonymous feedback collected in private chats.

use carebot_handler::{strip_command, ChatType, Handler};
use carebot_store::{ItemStore, Serializer, Store};
use chrono::Utc;
use tracing::info;

use crate::model::Feedback;

#[derive(Clone)]
pub struct FeedbackBox {
    entries: ItemStore<Vec<Feedback>>,
}

impl FeedbackBox {
    pub fn new(root: &Store<String, String>) -> Self {
        let entries = root
            .item("feedback".to_string())
            .contramap(Serializer::json_array())
            .default(Vec::new());
        Self { entries }
    }

    pub fn handler(&self) -> Handler {
        Handler::combine([self.add(), self.list(), self.clear()]).group("Feedback")
    }

    fn add(&self) -> Handler {
        let entries = self.entries.clone();
        Handler::act(move |ctx| {
            let entries = entries.clone();
            async move {
                let message = strip_command(ctx.text()).to_string();
                let user_id = ctx.sender().id;
                let mut duplicate = false;
                entries
                    .modify(|mut feedback| {
                        if feedback
                            .iter()
                            .any(|f| f.user_id == user_id && f.message == message)
                        {
                            duplicate = true;
                        } else {
                            feedback.push(Feedback {
                                user_id,
                                date: Utc::now(),
                                message: message.clone(),
                            });
                        }
                        feedback
                    })
                    .await?;

                if duplicate {
                    ctx.reply_with_markdown("You've already given this feedback");
                } else {
                    info!("Feedback received");
                    ctx.reply_with_markdown("Thanks!");
                }
                Ok(())
            }
        })
        .filter_or_reply(
            |ctx| strip_command(ctx.text()).chars().count() > 2,
            "Please enter a feedback message",
        )
        .on_chat_type(ChatType::Private, false)
        .description("Send anonymous feedback")
        .command(&["feedback"])
    }

    fn list(&self) -> Handler {
        let entries = self.entries.clone();
        Handler::act(move |ctx| {
            let entries = entries.clone();
            async move {
                let feedback = entries.get().await?.unwrap_or_default();
                if feedback.is_empty() {
                    ctx.reply_with_markdown("No feedback.");
                } else {
                    let lines: Vec<String> = feedback
                        .iter()
                        .rev()
                        .map(|f| format!("- {}", f.message))
                        .collect();
                    ctx.reply_with_markdown(&lines.join("\n"));
                }
                Ok(())
            }
        })
        .description("Anonymously list all provided feedback")
        .command(&["listfeedback"])
    }

    fn clear(&self) -> Handler {
        let entries = self.entries.clone();
        Handler::act(move |ctx| {
            let entries = entries.clone();
            async move {
                entries.insert(Vec::new()).await?;
                ctx.reply_with_markdown("Done");
                Ok(())
            }
        })
        .description("Delete all feedback")
        .command(&["clearfeedback"])
    }
}
