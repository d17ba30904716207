//! Store view scenarios spanning several layers.

use std::sync::Arc;

use carebot_store::{MemoryBackend, Serializer, Store, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    id: u32,
    title: String,
}

fn typed_tasks(root: &Store<String, String>) -> Store<u32, Task> {
    root.scope("tasks")
        .transform_key(|id: &u32| id.to_string())
        .contramap_value(Serializer::json())
}

#[tokio::test]
async fn test_tracked_collection_lifecycle() {
    let backend = Arc::new(MemoryBackend::new());
    let root = Store::new(backend.clone());
    let key_list = root
        .item("key_list".to_string())
        .contramap(Serializer::<Vec<u32>, String>::json_array())
        .default(Vec::new());
    let values = root
        .scope("values")
        .transform_key(|id: &u32| id.to_string())
        .track_keys(key_list.clone());

    assert_eq!(key_list.get().await.unwrap(), Some(vec![]));

    values.insert(&5, "x".to_string()).await.unwrap();
    assert_eq!(key_list.get().await.unwrap(), Some(vec![5]));

    values.insert(&5, "y".to_string()).await.unwrap();
    assert_eq!(key_list.get().await.unwrap(), Some(vec![5]));
    assert_eq!(values.get(&5).await.unwrap(), Some("y".to_string()));

    values.put(&5, None).await.unwrap();
    assert_eq!(key_list.get().await.unwrap(), Some(vec![]));
    assert_eq!(backend.raw("values/5"), None);
}

#[tokio::test]
async fn test_contramap_chain_round_trip() {
    let backend = Arc::new(MemoryBackend::new());
    let root = Store::new(backend.clone());
    let tasks = typed_tasks(&root);
    let task = Task {
        id: 12,
        title: "Call grandma".to_string(),
    };

    tasks.insert(&12, task.clone()).await.unwrap();

    assert_eq!(tasks.get(&12).await.unwrap(), Some(task));
    assert_eq!(
        backend.raw("tasks/12"),
        Some(r#"{"id":12,"title":"Call grandma"}"#.to_string())
    );
}

#[tokio::test]
async fn test_scope_keeps_transforms() {
    let backend = Arc::new(MemoryBackend::new());
    let root = Store::new(backend.clone());
    let tasks = typed_tasks(&root).default(|id: &u32| Task {
        id: *id,
        title: String::new(),
    });
    let chat_tasks = tasks.scope("chat-1");

    chat_tasks
        .insert(
            &3,
            Task {
                id: 3,
                title: "Water plants".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(backend.raw("tasks/chat-1/3").is_some());
    assert_eq!(chat_tasks.get(&4).await.unwrap().map(|t| t.id), Some(4));
}

#[tokio::test]
async fn test_modify_through_default_view() {
    let backend = Arc::new(MemoryBackend::new());
    let root = Store::new(backend.clone());
    let counters = root
        .scope("counters")
        .contramap_value(Serializer::<i64, String>::json())
        .default(|_| 0);
    let key = "visits".to_string();

    assert_eq!(counters.modify(&key, |n| n + 1).await.unwrap(), 1);
    assert_eq!(counters.modify(&key, |n| n + 1).await.unwrap(), 2);
    assert_eq!(backend.set_count(), 2);

    assert_eq!(counters.modify(&key, |n| n).await.unwrap(), 2);
    assert_eq!(backend.set_count(), 2);
}

#[tokio::test]
async fn test_corrupt_stored_value() {
    let backend = Arc::new(MemoryBackend::new().with_entry("tasks/1", "not json"));
    let root = Store::new(backend);

    let err = typed_tasks(&root).get(&1).await.unwrap_err();
    assert!(matches!(err, StoreError::Serialization(_)));
}
