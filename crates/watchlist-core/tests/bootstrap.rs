use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use watchlist_config::{Config, PathManager};
use watchlist_core::{AppContext, IdentityTransition, InitState, LocalCacheStore, MigrationDecision, SoftFailure, SyncOutcome};
use watchlist_models::{Identity, ItemKey, WatchItem, WatchStatus};
use watchlist_remote::{MemoryRepository, MemorySession};

fn user() -> Identity {
    Identity::new("user-1", "token")
}

fn context(remote: MemoryRepository, session: MemorySession) -> (AppContext, Arc<MemoryRepository>, Arc<MemorySession>) {
    let remote = Arc::new(remote);
    let session = Arc::new(session);
    let context = AppContext::new(Arc::new(LocalCacheStore::in_memory()), remote.clone(), session.clone());
    (context, remote, session)
}

#[tokio::test]
async fn test_guest_bootstrap_opens_gate_without_remote() {
    let (context, remote, _session) = context(MemoryRepository::new(), MemorySession::guest());
    assert_eq!(context.gate.state(), InitState::NotStarted);

    assert_eq!(context.bootstrap.run().await, None);
    assert!(context.gate.is_initialized());
    assert!(!context.coordinator.is_authenticated());
    assert_eq!(remote.write_calls(), 0);
}

#[tokio::test]
async fn test_signed_in_bootstrap_hydrates() {
    let remote = MemoryRepository::new().with_items("user-1", vec![WatchItem::series(1399, "GoT", WatchStatus::Watching)]);
    let (context, _remote, _session) = context(remote, MemorySession::signed_in(user()));

    let identity = context.bootstrap.run().await;
    assert_eq!(identity.map(|identity| identity.user_id), Some("user-1".to_string()));
    assert!(context.gate.is_initialized());
    assert_eq!(
        context.coordinator.query_status_of(&ItemKey::series(1399)),
        Some(WatchStatus::Watching)
    );
}

#[tokio::test]
async fn test_hydrate_failure_still_opens_gate() {
    let (context, remote, _session) = context(MemoryRepository::new(), MemorySession::signed_in(user()));
    context.store.write(&watchlist_models::Collection::from_items(vec![WatchItem::movie(
        1,
        "Cached",
        WatchStatus::Want,
    )]));
    remote.set_fail_reads(true);

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let _subscription = context.gate.on_initialized(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    context.bootstrap.run().await;
    assert!(context.gate.is_initialized());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    // Best-effort local state survives
    assert_eq!(context.coordinator.collection().len(), 1);
}

#[tokio::test]
async fn test_session_failure_still_opens_gate() {
    let (context, _remote, session) = context(MemoryRepository::new(), MemorySession::guest());
    session.set_fail(true);

    assert_eq!(context.bootstrap.run().await, None);
    assert!(context.gate.is_initialized());
}

#[tokio::test]
async fn test_login_migrates_guest_data() {
    let (context, remote, _session) = context(MemoryRepository::new(), MemorySession::guest());
    context.bootstrap.run().await;
    let _ = context
        .coordinator
        .add_item(WatchItem::movie(1, "A", WatchStatus::Want))
        .await
        .unwrap();
    let _ = context
        .coordinator
        .add_item(WatchItem::series(2, "B", WatchStatus::Watching))
        .await
        .unwrap();
    assert!(context.migration.should_warn_guest());

    let transition = context
        .bootstrap
        .handle_identity_change(Some(user()), &MigrationDecision::Migrate)
        .await;

    assert_eq!(transition, IdentityTransition::SignedIn { migrated: 2 });
    assert_eq!(remote.rows("user-1").len(), 2);
    assert_eq!(context.coordinator.collection().len(), 2);
    assert!(!context.migration.has_guest_data());
    assert!(context.gate.is_initialized());
}

#[tokio::test]
async fn test_login_without_guest_data_hydrates() {
    let remote = MemoryRepository::new().with_items("user-1", vec![WatchItem::movie(5, "E", WatchStatus::Completed)]);
    let (context, remote, _session) = context(remote, MemorySession::guest());
    context.bootstrap.run().await;

    let transition = context
        .bootstrap
        .handle_identity_change(Some(user()), &MigrationDecision::Migrate)
        .await;

    assert_eq!(transition, IdentityTransition::SignedIn { migrated: 0 });
    assert_eq!(remote.write_calls(), 0);
    assert!(context.coordinator.collection().contains(&ItemKey::movie(5)));
}

#[tokio::test]
async fn test_login_discarding_guest_data_loads_account() {
    let remote = MemoryRepository::new().with_items("user-1", vec![WatchItem::movie(5, "E", WatchStatus::Completed)]);
    let (context, remote, _session) = context(remote, MemorySession::guest());
    context.bootstrap.run().await;
    let _ = context
        .coordinator
        .add_item(WatchItem::movie(1, "A", WatchStatus::Want))
        .await
        .unwrap();

    let transition = context
        .bootstrap
        .handle_identity_change(Some(user()), &MigrationDecision::Discard)
        .await;

    assert_eq!(transition, IdentityTransition::SignedIn { migrated: 0 });
    assert_eq!(remote.write_calls(), 0);
    let collection = context.coordinator.collection();
    assert!(collection.contains(&ItemKey::movie(5)));
    assert!(!collection.contains(&ItemKey::movie(1)));
    assert!(!context.migration.has_guest_data());

    // The account row is known locally, so a second add is caught before the network
    let outcome = context
        .coordinator
        .add_item(WatchItem::movie(5, "E", WatchStatus::Want))
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::Skipped(SoftFailure::DuplicateItem));
    assert_eq!(remote.write_calls(), 0);
}

#[tokio::test]
async fn test_login_with_emptied_guest_list_loads_account() {
    let remote = MemoryRepository::new().with_items("user-1", vec![WatchItem::movie(5, "E", WatchStatus::Completed)]);
    let (context, _remote, _session) = context(remote, MemorySession::guest());
    context.bootstrap.run().await;
    let _ = context
        .coordinator
        .add_item(WatchItem::movie(1, "A", WatchStatus::Want))
        .await
        .unwrap();
    let _ = context.coordinator.remove_item(ItemKey::movie(1)).await.unwrap();
    assert!(context.migration.has_guest_data());
    assert!(context.coordinator.collection().is_empty());

    let transition = context
        .bootstrap
        .handle_identity_change(Some(user()), &MigrationDecision::Migrate)
        .await;

    assert_eq!(transition, IdentityTransition::SignedIn { migrated: 0 });
    assert_eq!(context.coordinator.collection().len(), 1);
    assert!(context.coordinator.collection().contains(&ItemKey::movie(5)));
    assert!(!context.migration.has_guest_data());
}

#[tokio::test]
async fn test_signed_in_bootstrap_migrates_pending_guest_data() {
    let store = Arc::new(LocalCacheStore::in_memory());

    let guest = AppContext::new(
        store.clone(),
        Arc::new(MemoryRepository::new()),
        Arc::new(MemorySession::guest()),
    );
    guest.bootstrap.run().await;
    let _ = guest
        .coordinator
        .add_item(WatchItem::movie(1, "A", WatchStatus::Want))
        .await
        .unwrap();

    // Next start finds a session that was established without a login transition
    let remote = Arc::new(
        MemoryRepository::new().with_items("user-1", vec![WatchItem::movie(5, "E", WatchStatus::Completed)]),
    );
    let signed_in = AppContext::new(store, remote.clone(), Arc::new(MemorySession::signed_in(user())));
    signed_in.bootstrap.run().await;

    assert!(signed_in.gate.is_initialized());
    let rows = remote.rows("user-1");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|item| item.key() == ItemKey::movie(1)));
    let collection = signed_in.coordinator.collection();
    assert!(collection.contains(&ItemKey::movie(1)));
    assert!(collection.contains(&ItemKey::movie(5)));
    assert!(!signed_in.migration.has_guest_data());
}

#[tokio::test]
async fn test_logout_clears_cache_and_reruns_bootstrap() {
    let remote = MemoryRepository::new().with_items("user-1", vec![WatchItem::movie(5, "E", WatchStatus::Completed)]);
    let (context, _remote, session) = context(remote, MemorySession::signed_in(user()));
    context.bootstrap.run().await;
    assert_eq!(context.coordinator.collection().len(), 1);

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let _subscription = context.gate.on_initialized(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    session.set_identity(None);
    let transition = context
        .bootstrap
        .handle_identity_change(None, &MigrationDecision::Migrate)
        .await;

    assert_eq!(transition, IdentityTransition::SignedOut);
    assert!(context.coordinator.collection().is_empty());
    assert!(!context.coordinator.is_authenticated());
    assert!(context.gate.is_initialized());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_follow_session_forwards_changes() {
    let (context, _remote, session) = context(MemoryRepository::new(), MemorySession::guest());
    let (subscription, mut changes) = context.bootstrap.follow_session();

    session.set_identity(Some(user()));
    session.set_identity(None);
    assert!(subscription.unsubscribe());
    session.set_identity(Some(user()));

    assert_eq!(changes.recv().await.flatten().map(|identity| identity.user_id), Some("user-1".to_string()));
    assert_eq!(changes.recv().await, Some(None));
    // Sender went away with the unsubscribed callback
    assert_eq!(changes.recv().await, None);
}

#[tokio::test]
async fn test_open_offline_context_persists_guest_data() {
    let dir = TempDir::new().unwrap();
    let paths = PathManager::from_base(dir.path().to_path_buf());
    let config = Config::default();

    {
        let (context, _session) = AppContext::open(&config, &paths).unwrap();
        assert_eq!(context.bootstrap.run().await, None);
        let _ = context
            .coordinator
            .add_item(WatchItem::movie(550, "Fight Club", WatchStatus::Want))
            .await
            .unwrap();
    }

    assert!(paths.store_dir().join("watchlist.json").exists());
    let (context, _session) = AppContext::open(&config, &paths).unwrap();
    context.bootstrap.run().await;
    assert_eq!(context.coordinator.query_status_of(&ItemKey::movie(550)), Some(WatchStatus::Want));
    assert!(context.migration.has_guest_data());
}

#[tokio::test]
async fn test_offline_signed_in_write_fails() {
    let dir = TempDir::new().unwrap();
    let paths = PathManager::from_base(dir.path().to_path_buf());
    let (context, session) = AppContext::open(&Config::default(), &paths).unwrap();
    session.login(user()).unwrap();

    assert!(context.bootstrap.run().await.is_some());
    assert!(context.gate.is_initialized());
    let result = context
        .coordinator
        .add_item(WatchItem::movie(1, "A", WatchStatus::Want))
        .await;
    assert!(result.is_err());
    assert!(context.coordinator.collection().is_empty());
}
