//! Handler tree and its two interpreters.
//!
//! A [`Handler`] is an immutable node. Decorator methods never mutate the
//! receiver; they wrap it in a new node, so one subtree may be shared by
//! several parents.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::{ChatType, Context};
use crate::details::HandlerDetails;
use crate::error::HandlerResult;
use crate::text::{arguments, command_arguments, matched_command};

type ActionFn = Arc<dyn Fn(Context) -> BoxFuture<'static, HandlerResult<bool>> + Send + Sync>;
/// Guard predicate. The second argument is the command alias matched above
/// the guard, if any.
type PredicateFn = Arc<dyn Fn(&Context, Option<&str>) -> bool + Send + Sync>;

/// How a composite node offers a message to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// Every child is offered the message, in order.
    All,
    /// Children are offered the message until one accepts it.
    FirstMatch,
}

#[derive(Debug, Clone)]
enum Annotation {
    Name(String),
    Description(String),
    Group(String),
    Requirement(String),
}

impl Annotation {
    fn apply(&self, details: &mut HandlerDetails) {
        match self {
            Annotation::Name(name) => details.name = Some(name.clone()),
            Annotation::Description(text) => details.description = Some(text.clone()),
            Annotation::Group(group) => details.group = Some(group.clone()),
            Annotation::Requirement(req) => details.requirements.push(req.clone()),
        }
    }
}

enum Node {
    Leaf(ActionFn),
    Filter {
        predicate: PredicateFn,
        rejection: Option<String>,
        inner: Handler,
    },
    Annotate {
        annotation: Annotation,
        inner: Handler,
    },
    Command {
        names: Vec<String>,
        inner: Handler,
    },
    Composite {
        mode: Composition,
        children: Vec<Handler>,
    },
}

/// A node in the message routing tree.
#[derive(Clone)]
pub struct Handler {
    node: Arc<Node>,
}

impl Handler {
    fn from_node(node: Node) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    /// Leaf whose action decides whether it consumed the message.
    pub fn create<F, Fut>(action: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<bool>> + Send + 'static,
    {
        Self::from_node(Node::Leaf(Arc::new(move |ctx| action(ctx).boxed())))
    }

    /// Leaf that always consumes the message once its action completes.
    pub fn act<F, Fut>(action: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        Self::create(move |ctx| {
            let fut = action(ctx);
            async move {
                fut.await?;
                Ok(true)
            }
        })
    }

    /// Offer the message to every child in order.
    ///
    /// Accepts if any child accepted. A failing child does not stop the
    /// remaining children; the first failure is returned after all ran.
    pub fn combine(children: impl IntoIterator<Item = Handler>) -> Self {
        Self::from_node(Node::Composite {
            mode: Composition::All,
            children: children.into_iter().collect(),
        })
    }

    /// Offer the message to children in order until one accepts it.
    pub fn first_only(children: impl IntoIterator<Item = Handler>) -> Self {
        Self::from_node(Node::Composite {
            mode: Composition::FirstMatch,
            children: children.into_iter().collect(),
        })
    }

    /// Delegate only when `predicate` holds.
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.guard(predicate, None)
    }

    /// Like [`Handler::filter`], replying `message` on rejection.
    pub fn filter_or_reply<P>(&self, predicate: P, message: impl Into<String>) -> Self
    where
        P: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.guard(predicate, Some(message.into()))
    }

    fn guard<P>(&self, predicate: P, rejection: Option<String>) -> Self
    where
        P: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.routed_guard(move |ctx, _| predicate(ctx), rejection)
    }

    fn routed_guard<P>(&self, predicate: P, rejection: Option<String>) -> Self
    where
        P: Fn(&Context, Option<&str>) -> bool + Send + Sync + 'static,
    {
        Self::from_node(Node::Filter {
            predicate: Arc::new(predicate),
            rejection,
            inner: self.clone(),
        })
    }

    /// Match `/name` for any of the aliases; the first alias names the route.
    ///
    /// Aliases may be given with or without the leading slash. When several
    /// aliases match, the longest one is what guards beneath see as the
    /// command.
    pub fn command(&self, names: &[&str]) -> Self {
        let names: Vec<String> = names
            .iter()
            .map(|name| name.trim_start_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let primary = names.first().map(|name| format!("/{}", name));
        let routed = Self::from_node(Node::Command {
            names,
            inner: self.clone(),
        });
        match primary {
            Some(name) => routed.name(name),
            None => routed,
        }
    }

    /// Only accept messages from a chat of `kind`.
    pub fn on_chat_type(&self, kind: ChatType, announce: bool) -> Self {
        let rejection = announce.then(|| format!("Try again in a *{}* chat", kind));
        self.guard(move |ctx| ctx.chat().kind == kind, rejection)
            .requirement(format!("{} chat", kind))
    }

    /// Only accept messages that mention at least one user.
    pub fn has_user_entities(&self, announce: bool) -> Self {
        let rejection = announce.then(|| "Try again except *@mentioning* a user".to_string());
        self.guard(|ctx| ctx.message().has_user_entities(), rejection)
            .requirement("@mention a user")
    }

    /// Only accept messages with at least `min` arguments after the command.
    ///
    /// Beneath [`Handler::command`] the whole matched alias is skipped, so
    /// `/task remove 3` has one argument. Elsewhere only the first token is.
    pub fn with_argument_count(&self, min: usize, error: Option<&str>) -> Self {
        self.routed_guard(
            move |ctx, command| {
                let text = ctx.text();
                let count = match command {
                    Some(name) => command_arguments(text, std::slice::from_ref(&name)).len(),
                    None => arguments(text).len(),
                };
                count >= min
            },
            error.map(str::to_string),
        )
    }

    pub fn name(&self, name: impl Into<String>) -> Self {
        self.annotate(Annotation::Name(name.into()))
    }

    pub fn description(&self, description: impl Into<String>) -> Self {
        self.annotate(Annotation::Description(description.into()))
    }

    pub fn group(&self, group: impl Into<String>) -> Self {
        self.annotate(Annotation::Group(group.into()))
    }

    /// Record a precondition shown in help. Requirements accumulate.
    pub fn requirement(&self, requirement: impl Into<String>) -> Self {
        self.annotate(Annotation::Requirement(requirement.into()))
    }

    fn annotate(&self, annotation: Annotation) -> Self {
        Self::from_node(Node::Annotate {
            annotation,
            inner: self.clone(),
        })
    }

    /// Offer the message to this subtree.
    ///
    /// `Ok(true)` means at least one leaf beneath consumed it; a rejected
    /// predicate is `Ok(false)`, not an error.
    pub fn accept<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, HandlerResult<bool>> {
        self.accept_routed(ctx, None)
    }

    fn accept_routed<'a>(
        &'a self,
        ctx: &'a Context,
        command: Option<&'a str>,
    ) -> BoxFuture<'a, HandlerResult<bool>> {
        async move {
            match &*self.node {
                Node::Leaf(action) => action(ctx.clone()).await,
                Node::Filter {
                    predicate,
                    rejection,
                    inner,
                } => {
                    if predicate(ctx, command) {
                        inner.accept_routed(ctx, command).await
                    } else {
                        if let Some(message) = rejection {
                            ctx.reply_with_markdown(message);
                        }
                        Ok(false)
                    }
                }
                Node::Annotate { inner, .. } => inner.accept_routed(ctx, command).await,
                Node::Command { names, inner } => {
                    match matched_command(ctx.text(), names.as_slice()) {
                        Some(name) => inner.accept_routed(ctx, Some(name)).await,
                        None => Ok(false),
                    }
                }
                Node::Composite {
                    mode: Composition::All,
                    children,
                } => {
                    let mut accepted = false;
                    let mut failure = None;
                    for child in children {
                        match child.accept_routed(ctx, command).await {
                            Ok(consumed) => accepted |= consumed,
                            Err(e) => {
                                warn!("Handler failed for chat {}: {}", ctx.chat().id, e);
                                failure.get_or_insert(e);
                            }
                        }
                    }
                    match failure {
                        Some(e) => Err(e),
                        None => Ok(accepted),
                    }
                }
                Node::Composite {
                    mode: Composition::FirstMatch,
                    children,
                } => {
                    for (index, child) in children.iter().enumerate() {
                        if child.accept_routed(ctx, command).await? {
                            debug!("First-match child {} accepted", index);
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
            }
        }
        .boxed()
    }

    /// Help metadata for every annotated leaf beneath this node.
    ///
    /// Composites concatenate their children. An annotation applies to every
    /// entry of its child, synthesizing one empty entry when the child has
    /// none, so an annotated leaf always contributes at least one entry.
    pub fn details(&self) -> Vec<HandlerDetails> {
        match &*self.node {
            Node::Leaf(_) => Vec::new(),
            Node::Filter { inner, .. } | Node::Command { inner, .. } => inner.details(),
            Node::Annotate { annotation, inner } => {
                let mut details = inner.details();
                if details.is_empty() {
                    details.push(HandlerDetails::default());
                }
                for entry in &mut details {
                    annotation.apply(entry);
                }
                details
            }
            Node::Composite { children, .. } => {
                children.iter().flat_map(Handler::details).collect()
            }
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &*self.node {
            Node::Leaf(_) => "Leaf",
            Node::Filter { .. } => "Filter",
            Node::Annotate { .. } => "Annotate",
            Node::Command { .. } => "Command",
            Node::Composite { .. } => "Composite",
        };
        f.debug_struct("Handler").field("node", &kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Chat, Message, User};
    use crate::error::HandlerError;
    use crate::mock::MockContext;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting(counter: &Arc<AtomicU32>) -> Handler {
        let counter = counter.clone();
        Handler::act(move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn group_text(text: &str) -> (Arc<MockContext>, Context) {
        MockContext::from_text(Chat::group(-1), User::new(1, "Ada"), text).shared()
    }

    #[tokio::test]
    async fn test_create_reports_action_result() {
        let declines = Handler::create(|_| async { Ok(false) });
        let (_, ctx) = group_text("hello");

        assert!(!declines.accept(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_filter_rejection_replies() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler = counting(&hits).filter_or_reply(|_| false, "Nope");
        let (mock, ctx) = group_text("hello");

        assert!(!handler.accept(&ctx).await.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(mock.reply_texts(), vec!["Nope"]);
    }

    #[tokio::test]
    async fn test_on_chat_type_announces() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler = counting(&hits).on_chat_type(ChatType::Private, true);
        let (mock, ctx) = group_text("hi");

        assert!(!handler.accept(&ctx).await.unwrap());
        assert_eq!(mock.last_reply().as_deref(), Some("Try again in a *private* chat"));
    }

    #[tokio::test]
    async fn test_on_chat_type_silent() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler = counting(&hits).on_chat_type(ChatType::Private, false);
        let (mock, ctx) = group_text("hi");

        assert!(!handler.accept(&ctx).await.unwrap());
        assert!(mock.replies().is_empty());
    }

    #[tokio::test]
    async fn test_has_user_entities() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler = counting(&hits).has_user_entities(true);

        let (mock, ctx) = group_text("/add");
        assert!(!handler.accept(&ctx).await.unwrap());
        assert_eq!(
            mock.last_reply().as_deref(),
            Some("Try again except *@mentioning* a user")
        );

        let message = Message::new(Chat::group(-1), User::new(1, "Ada"), "/add")
            .with_mention(User::new(2, "Grace"));
        let (_, ctx) = MockContext::new(message).shared();
        assert!(handler.accept(&ctx).await.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_argument_count() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler = counting(&hits).with_argument_count(2, Some("Need two"));

        let (mock, ctx) = group_text("/pick 1");
        assert!(!handler.accept(&ctx).await.unwrap());
        assert_eq!(mock.last_reply().as_deref(), Some("Need two"));

        let (_, ctx) = group_text("/pick@CareBot 1,2");
        assert!(handler.accept(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_argument_count_skips_multi_word_command() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler = counting(&hits)
            .with_argument_count(1, Some("Need an id"))
            .command(&["task remove", "remove_task"]);

        let (mock, ctx) = group_text("/task remove");
        assert!(!handler.accept(&ctx).await.unwrap());
        assert_eq!(mock.reply_texts(), vec!["Need an id"]);

        let (mock, ctx) = group_text("/remove_task");
        assert!(!handler.accept(&ctx).await.unwrap());
        assert_eq!(mock.reply_texts(), vec!["Need an id"]);

        let (_, ctx) = group_text("/task remove 12");
        assert!(handler.accept(&ctx).await.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_command_prefers_longest_alias() {
        let hits = Arc::new(AtomicU32::new(0));
        let handler = counting(&hits)
            .with_argument_count(1, None)
            .command(&["task", "task list"]);

        let (_, ctx) = group_text("/task list");
        assert!(!handler.accept(&ctx).await.unwrap());

        let (_, ctx) = group_text("/task list 2");
        assert!(handler.accept(&ctx).await.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_combine_keeps_going_after_failure() {
        let hits = Arc::new(AtomicU32::new(0));
        let failing = Handler::act(|_| async { Err(HandlerError::Action("boom".to_string())) });
        let handler = Handler::combine([failing, counting(&hits)]);
        let (_, ctx) = group_text("hi");

        let err = handler.accept(&ctx).await.unwrap_err();

        assert!(matches!(err, HandlerError::Action(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_only_stops_on_failure() {
        let hits = Arc::new(AtomicU32::new(0));
        let failing = Handler::act(|_| async { Err(HandlerError::Action("boom".to_string())) });
        let handler = Handler::first_only([failing, counting(&hits)]);
        let (_, ctx) = group_text("hi");

        assert!(handler.accept(&ctx).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_details_fold() {
        let leaf = Handler::act(|_| async { Ok(()) });
        assert!(leaf.details().is_empty());

        let described = leaf
            .on_chat_type(ChatType::Group, true)
            .description("Begin a group")
            .command(&["init", "start"])
            .group("Groups");
        let details = described.details();

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].name.as_deref(), Some("/init"));
        assert_eq!(details[0].description.as_deref(), Some("Begin a group"));
        assert_eq!(details[0].group.as_deref(), Some("Groups"));
        assert_eq!(details[0].requirements, vec!["group chat".to_string()]);
    }

    #[test]
    fn test_annotation_applies_to_every_child_entry() {
        let a = Handler::act(|_| async { Ok(()) }).name("/a");
        let b = Handler::act(|_| async { Ok(()) }).name("/b");
        let bare = Handler::act(|_| async { Ok(()) });

        let details = Handler::combine([a, b, bare]).group("Letters").details();

        assert_eq!(details.len(), 2);
        assert!(details.iter().all(|d| d.group.as_deref() == Some("Letters")));
    }

    #[test]
    fn test_command_name_normalizes_slash() {
        let handler = Handler::act(|_| async { Ok(()) }).command(&["/task add", "add_task"]);
        assert_eq!(handler.details()[0].name.as_deref(), Some("/task add"));
    }
}
