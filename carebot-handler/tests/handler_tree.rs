//! Routing and help scenarios across whole handler trees.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use carebot_handler::{Chat, ChatType, Context, Handler, MockContext, Reply, User};
use carebot_store::{MemoryBackend, Serializer, Store};

fn recorder(hits: &Arc<AtomicU32>, accepted: bool) -> Handler {
    let hits = hits.clone();
    Handler::create(move |_| {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(accepted)
        }
    })
}

fn group_message(text: &str) -> (Arc<MockContext>, Context) {
    MockContext::from_text(Chat::group(-42), User::new(1, "Ada"), text).shared()
}

#[tokio::test]
async fn test_combine_runs_every_child() {
    let first = Arc::new(AtomicU32::new(0));
    let second = Arc::new(AtomicU32::new(0));
    let root = Handler::combine([recorder(&first, false), recorder(&second, true)]);
    let (_, ctx) = group_message("hello");

    assert!(root.accept(&ctx).await.unwrap());
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_first_only_stops_at_first_acceptance() {
    let first = Arc::new(AtomicU32::new(0));
    let second = Arc::new(AtomicU32::new(0));
    let root = Handler::first_only([recorder(&first, true), recorder(&second, true)]);
    let (_, ctx) = group_message("hello");

    assert!(root.accept(&ctx).await.unwrap());
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_first_only_none_match() {
    let hits = Arc::new(AtomicU32::new(0));
    let root = Handler::first_only([recorder(&hits, false), recorder(&hits, false)]);
    let (_, ctx) = group_message("hello");

    assert!(!root.accept(&ctx).await.unwrap());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_command_matching() {
    let hits = Arc::new(AtomicU32::new(0));
    let add = recorder(&hits, true).command(&["add", "adduser"]);

    for text in ["/add", "/add extra text", "/adduser", "[!!] /add"] {
        let (_, ctx) = group_message(text);
        assert!(add.accept(&ctx).await.unwrap(), "{text} should match");
    }
    for text in ["/addother", "/add2", "add", "hello /add"] {
        let (_, ctx) = group_message(text);
        assert!(!add.accept(&ctx).await.unwrap(), "{text} should not match");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_store_backed_action() {
    let backend = Arc::new(MemoryBackend::new());
    let counter = Store::new(backend.clone())
        .item("pings".to_string())
        .contramap(Serializer::<u64, String>::json())
        .default(0);
    let root = Handler::act(move |ctx| {
        let counter = counter.clone();
        async move {
            let count = counter.modify(|n| n + 1).await?;
            ctx.reply(&format!("pong #{}", count));
            Ok(())
        }
    })
    .command(&["ping"]);

    for _ in 0..2 {
        let (_, ctx) = group_message("/ping");
        root.accept(&ctx).await.unwrap();
    }
    let (mock, ctx) = group_message("/ping");
    root.accept(&ctx).await.unwrap();

    assert_eq!(mock.last_reply().as_deref(), Some("pong #3"));
    assert_eq!(backend.raw("pings"), Some("3".to_string()));
}

#[tokio::test]
async fn test_store_failure_surfaces_as_error() {
    let backend = Arc::new(MemoryBackend::new());
    let item = Store::new(backend.clone()).item("k".to_string());
    let root = Handler::act(move |_| {
        let item = item.clone();
        async move {
            item.insert("v".to_string()).await?;
            Ok(())
        }
    });
    backend.set_available(false);
    let (_, ctx) = group_message("anything");

    assert!(root.accept(&ctx).await.is_err());
}

fn documented_tree(hits: &Arc<AtomicU32>) -> Handler {
    Handler::combine([
        recorder(hits, true)
            .description("List all tasks")
            .command(&["tasks", "task list"])
            .group("Tasks"),
        recorder(hits, true)
            .on_chat_type(ChatType::Private, false)
            .description("Send anonymous feedback")
            .command(&["feedback"]),
        recorder(hits, true)
            .description("Add a task")
            .command(&["task add"])
            .group("Tasks"),
        recorder(hits, false),
    ])
}

#[tokio::test]
async fn test_help_groups_and_does_not_fall_through() {
    let hits = Arc::new(AtomicU32::new(0));
    let root = documented_tree(&hits).help();
    let (mock, ctx) = group_message("/help");

    assert!(root.accept(&ctx).await.unwrap());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(
        mock.replies(),
        vec![
            Reply::Markdown("*Tasks*\n/tasks - List all tasks\n/task add - Add a task".to_string()),
            Reply::Markdown(
                "*Other*\n/feedback - Send anonymous feedback _(private chat)_".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn test_help_search() {
    let hits = Arc::new(AtomicU32::new(0));
    let root = documented_tree(&hits).help();

    let (mock, ctx) = group_message("/help ADD");
    root.accept(&ctx).await.unwrap();
    assert_eq!(mock.reply_texts(), vec!["*Tasks*\n/task add - Add a task"]);

    let (mock, ctx) = group_message("/help karma");
    root.accept(&ctx).await.unwrap();
    assert_eq!(mock.reply_texts(), vec!["No commands match *karma*"]);
}

#[tokio::test]
async fn test_help_passes_other_messages_through() {
    let hits = Arc::new(AtomicU32::new(0));
    let root = documented_tree(&hits).help();
    let (_, ctx) = group_message("/tasks");

    assert!(root.accept(&ctx).await.unwrap());
    // tasks leaf plus the undocumented catch-all
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(root.details().len(), 4);
}
