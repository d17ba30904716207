//! Hands inbound messages to the root handler.

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::context::Context;
use crate::error::HandlerResult;
use crate::handler::Handler;

/// Routes each inbound message into one handler tree.
///
/// There is no queue or backpressure: every dispatched message runs as its
/// own task, so store operations from different messages interleave.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    root: Handler,
}

impl Dispatcher {
    pub fn new(root: Handler) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Handler {
        &self.root
    }

    /// Run the tree inline and report whether the message was consumed.
    pub async fn handle(&self, ctx: Context) -> HandlerResult<bool> {
        let chat_id = ctx.chat().id;
        let accepted = self.root.accept(&ctx).await?;
        if !accepted {
            debug!("No handler accepted message in chat {}", chat_id);
        }
        Ok(accepted)
    }

    /// Run the tree on a spawned task.
    ///
    /// Failures are logged and reported to the join handle as `false`.
    pub fn dispatch(&self, ctx: Context) -> JoinHandle<bool> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let chat_id = ctx.chat().id;
            match dispatcher.handle(ctx).await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Dispatch failed in chat {}: {}", chat_id, e);
                    false
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Chat, User};
    use crate::error::HandlerError;
    use crate::mock::MockContext;

    #[tokio::test]
    async fn test_dispatch_reports_outcome() {
        let root = Handler::act(|ctx| async move {
            ctx.reply("pong");
            Ok(())
        })
        .command(&["ping"]);
        let dispatcher = Dispatcher::new(root);

        let (mock, ctx) = MockContext::from_text(Chat::private(7), User::new(7, "Bo"), "/ping").shared();
        assert!(dispatcher.dispatch(ctx).await.unwrap());
        assert_eq!(mock.reply_texts(), vec!["pong"]);

        let (_, ctx) = MockContext::from_text(Chat::private(7), User::new(7, "Bo"), "/pong").shared();
        assert!(!dispatcher.dispatch(ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_not_accepted() {
        let root = Handler::act(|_| async { Err(HandlerError::Action("down".to_string())) });
        let dispatcher = Dispatcher::new(root);
        let (_, ctx) = MockContext::from_text(Chat::private(7), User::new(7, "Bo"), "x").shared();

        assert!(!dispatcher.dispatch(ctx.clone()).await.unwrap());
        assert!(dispatcher.handle(ctx).await.is_err());
    }
}
