//! End-to-end tests of the "complete OAuth flow" hand-off between tabs.
//!
//! The sign-up tab creates the task when the flow is persisted and stores
//! key material before polling for email verification. Either that tab or
//! the tab opened from the verification link finishes the flow; the other
//! must see the task gone and do nothing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use pending_tasks::registry::memory::{LocalTab, TabDirectory};
use pending_tasks::store::memory::InMemoryStorage;
use pending_tasks::{
    PendingTaskContext, PendingTasks, TaskData, TaskError, COMPLETE_OAUTH_FLOW_TASK,
    KEY_FETCH_TOKEN, UNWRAP_B_KEY,
};

/// Keys the relier needs, as read from the account or the pending task.
#[derive(Debug, Clone, PartialEq)]
struct OAuthKeys {
    key_fetch_token: Option<String>,
    unwrap_b_key: Option<String>,
}

fn flow_for(
    storage: &Arc<InMemoryStorage>,
    directory: &TabDirectory,
) -> (Arc<LocalTab>, PendingTaskContext) {
    let tab = Arc::new(directory.register());
    tab.mark_ready();
    let tasks = PendingTasks::new(storage.clone(), tab.clone());
    (tab, tasks.scoped(COMPLETE_OAUTH_FLOW_TASK))
}

async fn persist_and_store_keys(flow: &PendingTaskContext) {
    flow.create(TaskData::new()).await.unwrap();
    flow.set(KEY_FETCH_TOKEN, json!("kft-123")).await.unwrap();
    flow.set(UNWRAP_B_KEY, json!("ubk-456")).await.unwrap();
}

/// Finishes the flow, counting completions sent.
async fn finish_flow(flow: &PendingTaskContext, sent: &AtomicUsize) -> Option<OAuthKeys> {
    flow.finish(|task| async move {
        sent.fetch_add(1, Ordering::SeqCst);
        Ok::<_, TaskError>(OAuthKeys {
            key_fetch_token: task.get_typed(KEY_FETCH_TOKEN),
            unwrap_b_key: task.get_typed(UNWRAP_B_KEY),
        })
    })
    .await
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_signup_tab_finishes_and_verification_tab_backs_off() {
    let storage = Arc::new(InMemoryStorage::new());
    let directory = TabDirectory::new();
    let (_signup_tab, signup) = flow_for(&storage, &directory);
    let (_verify_tab, verify) = flow_for(&storage, &directory);
    let sent = Arc::new(AtomicUsize::new(0));

    persist_and_store_keys(&signup).await;

    // The verification tab starts finishing while the sign-up tab is live.
    let verify_finish = {
        let verify = verify.clone();
        let sent = sent.clone();
        tokio::spawn(async move { finish_flow(&verify, &sent).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    let keys = finish_flow(&signup, &sent).await.expect("owner finishes");
    assert_eq!(
        keys,
        OAuthKeys {
            key_fetch_token: Some("kft-123".to_string()),
            unwrap_b_key: Some("ubk-456".to_string()),
        }
    );

    let verify_result = verify_finish.await.unwrap();
    assert!(verify_result.is_none());
    assert_eq!(sent.load(Ordering::SeqCst), 1);
    assert!(storage.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_verification_tab_takes_over_when_signup_tab_closes() {
    let storage = Arc::new(InMemoryStorage::new());
    let directory = TabDirectory::new();
    let (signup_tab, signup) = flow_for(&storage, &directory);
    let (_verify_tab, verify) = flow_for(&storage, &directory);
    let sent = AtomicUsize::new(0);

    persist_and_store_keys(&signup).await;
    signup_tab.close();

    let keys = finish_flow(&verify, &sent)
        .await
        .expect("verification tab should claim the abandoned task");
    assert_eq!(keys.key_fetch_token.as_deref(), Some("kft-123"));
    assert_eq!(keys.unwrap_b_key.as_deref(), Some("ubk-456"));
    assert_eq!(sent.load(Ordering::SeqCst), 1);

    // Nothing left for anyone else.
    assert!(verify.retrieve().await.unwrap().is_none());
}

#[tokio::test]
async fn test_keys_are_optional_when_relier_does_not_want_them() {
    let storage = Arc::new(InMemoryStorage::new());
    let directory = TabDirectory::new();
    let (_tab, flow) = flow_for(&storage, &directory);
    let sent = AtomicUsize::new(0);

    flow.create(TaskData::new()).await.unwrap();
    let keys = finish_flow(&flow, &sent).await.unwrap();
    assert_eq!(
        keys,
        OAuthKeys {
            key_fetch_token: None,
            unwrap_b_key: None,
        }
    );
}

#[tokio::test]
async fn test_context_reads_data_through_retrieve() {
    let storage = Arc::new(InMemoryStorage::new());
    let directory = TabDirectory::new();
    let (_tab, flow) = flow_for(&storage, &directory);

    assert_eq!(flow.task_id(), COMPLETE_OAUTH_FLOW_TASK);
    assert_eq!(flow.get_data(KEY_FETCH_TOKEN).await.unwrap(), None);

    persist_and_store_keys(&flow).await;
    assert_eq!(
        flow.get_data(KEY_FETCH_TOKEN).await.unwrap(),
        Some(json!("kft-123"))
    );
    let wrong_type: Option<u64> = flow.get_typed(UNWRAP_B_KEY).await.unwrap();
    assert_eq!(wrong_type, None);

    flow.clear().await.unwrap();
    assert!(matches!(
        flow.set(KEY_FETCH_TOKEN, json!("late")).await,
        Err(TaskError::NotFound { .. })
    ));
}
