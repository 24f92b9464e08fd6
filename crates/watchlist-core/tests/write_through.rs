use std::collections::HashSet;
use std::sync::Arc;
use watchlist_core::{
    HydrateOutcome, LocalCacheStore, MigrationDecision, MigrationProtocol, SoftFailure, SyncCoordinator, SyncError,
    SyncOutcome,
};
use watchlist_models::{Identity, ItemKey, Progress, WatchItem, WatchStatus};
use watchlist_remote::{MemoryRepository, RemoteMediaRepository};

struct Harness {
    store: Arc<LocalCacheStore>,
    remote: Arc<MemoryRepository>,
    coordinator: Arc<SyncCoordinator>,
}

impl Harness {
    fn new(remote: MemoryRepository) -> Self {
        let store = Arc::new(LocalCacheStore::in_memory());
        let remote = Arc::new(remote);
        let coordinator = Arc::new(SyncCoordinator::new(Arc::clone(&store), remote.clone()));
        Self { store, remote, coordinator }
    }

    fn guest() -> Self {
        Self::new(MemoryRepository::new())
    }

    fn migration(&self) -> MigrationProtocol {
        MigrationProtocol::new(Arc::clone(&self.coordinator), Arc::clone(&self.store), self.remote.clone())
    }

    fn partition_keys(&self, status: WatchStatus) -> Vec<ItemKey> {
        self.coordinator.query_by_status(status).iter().map(WatchItem::key).collect()
    }
}

fn user() -> Identity {
    Identity::new("user-1", "token").with_email("viewer@example.com")
}

/// Small deterministic generator so the operation sequence is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

#[tokio::test]
async fn test_guest_operations_keep_partitions_disjoint() {
    let harness = Harness::guest();
    let mut rng = Lcg(42);
    let mut expected: HashSet<ItemKey> = HashSet::new();

    for _ in 0..300 {
        let id = rng.next(12) as i64;
        let item = if rng.next(2) == 0 {
            WatchItem::movie(id, "Movie", WatchStatus::ALL[rng.next(3) as usize])
        } else {
            WatchItem::series(id, "Series", WatchStatus::ALL[rng.next(3) as usize])
        };
        let key = item.key();

        match rng.next(3) {
            0 => {
                let outcome = harness.coordinator.add_item(item).await.unwrap();
                if expected.insert(key) {
                    assert_eq!(outcome, SyncOutcome::Applied);
                } else {
                    assert_eq!(outcome, SyncOutcome::Skipped(SoftFailure::DuplicateItem));
                }
            }
            1 => {
                let _ = harness.coordinator.remove_item(key).await.unwrap();
                expected.remove(&key);
            }
            _ => {
                let status = WatchStatus::ALL[rng.next(3) as usize];
                let outcome = harness.coordinator.change_status(key, status).await.unwrap();
                assert_eq!(outcome.is_applied(), expected.contains(&key));
            }
        }

        let mut seen = HashSet::new();
        for status in WatchStatus::ALL {
            for key in harness.partition_keys(status) {
                assert!(seen.insert(key), "{} appears in more than one partition", key);
            }
        }
        assert_eq!(seen, expected);
    }
}

#[tokio::test]
async fn test_add_then_query_status_of() {
    let harness = Harness::guest();
    for (id, status) in [(1, WatchStatus::Want), (2, WatchStatus::Watching), (3, WatchStatus::Completed)] {
        let _ = harness.coordinator.add_item(WatchItem::series(id, "Show", status)).await.unwrap();
        assert_eq!(harness.coordinator.query_status_of(&ItemKey::series(id)), Some(status));
    }
}

#[tokio::test]
async fn test_duplicate_add_is_skipped() {
    let harness = Harness::guest();
    let first = harness
        .coordinator
        .add_item(WatchItem::movie(550, "Fight Club", WatchStatus::Want))
        .await
        .unwrap();
    let second = harness
        .coordinator
        .add_item(WatchItem::movie(550, "Fight Club", WatchStatus::Completed))
        .await
        .unwrap();

    assert_eq!(first, SyncOutcome::Applied);
    assert_eq!(second, SyncOutcome::Skipped(SoftFailure::DuplicateItem));
    assert_eq!(harness.coordinator.collection().len(), 1);
    assert_eq!(harness.coordinator.query_status_of(&ItemKey::movie(550)), Some(WatchStatus::Want));
}

#[tokio::test]
async fn test_same_id_different_kind_is_not_a_duplicate() {
    let harness = Harness::guest();
    let _ = harness.coordinator.add_item(WatchItem::movie(7, "Movie", WatchStatus::Want)).await.unwrap();
    let outcome = harness
        .coordinator
        .add_item(WatchItem::series(7, "Series", WatchStatus::Want))
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::Applied);
    assert_eq!(harness.coordinator.collection().len(), 2);
}

#[tokio::test]
async fn test_authenticated_duplicate_never_reaches_remote() {
    let harness = Harness::guest();
    harness.coordinator.switch_identity(Some(user()));
    let _ = harness.coordinator.add_item(WatchItem::movie(1, "A", WatchStatus::Want)).await.unwrap();
    let calls = harness.remote.write_calls();

    let outcome = harness.coordinator.add_item(WatchItem::movie(1, "A", WatchStatus::Want)).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Skipped(SoftFailure::DuplicateItem));
    assert_eq!(harness.remote.write_calls(), calls);
}

#[tokio::test]
async fn test_hydrate_twice_is_idempotent() {
    let remote = MemoryRepository::new().with_items(
        "user-1",
        vec![
            WatchItem::movie(1, "A", WatchStatus::Want),
            WatchItem::series(2, "B", WatchStatus::Watching),
            WatchItem::movie(3, "C", WatchStatus::Completed),
        ],
    );
    let harness = Harness::new(remote);
    harness.coordinator.switch_identity(Some(user()));

    let first = harness.coordinator.hydrate_from_remote().await.unwrap();
    let after_first = harness.coordinator.collection();
    let second = harness.coordinator.hydrate_from_remote().await.unwrap();
    let after_second = harness.coordinator.collection();

    assert_eq!(first, HydrateOutcome::Hydrated { items: 3 });
    assert_eq!(first, second);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_hydrate_replaces_local_cache() {
    let remote = MemoryRepository::new().with_items("user-1", vec![WatchItem::movie(1, "Remote", WatchStatus::Want)]);
    let harness = Harness::new(remote);
    let _ = harness.coordinator.add_item(WatchItem::movie(99, "Local", WatchStatus::Want)).await.unwrap();

    harness.coordinator.switch_identity(Some(user()));
    let _ = harness.coordinator.hydrate_from_remote().await.unwrap();

    let collection = harness.coordinator.collection();
    assert_eq!(collection.len(), 1);
    assert!(collection.contains(&ItemKey::movie(1)));
    assert!(!collection.contains(&ItemKey::movie(99)));
}

#[tokio::test]
async fn test_hydrate_for_guest_is_skipped() {
    let harness = Harness::guest();
    assert_eq!(harness.coordinator.hydrate_from_remote().await.unwrap(), HydrateOutcome::Skipped);
}

#[tokio::test]
async fn test_failed_hydrate_keeps_local_cache() {
    let harness = Harness::guest();
    let _ = harness.coordinator.add_item(WatchItem::movie(1, "A", WatchStatus::Want)).await.unwrap();
    harness.coordinator.switch_identity(Some(user()));
    harness.remote.set_fail_reads(true);

    let result = harness.coordinator.hydrate_from_remote().await;
    assert!(matches!(result, Err(SyncError::RemoteReadFailed(_))));
    assert_eq!(harness.coordinator.collection().len(), 1);
}

#[tokio::test]
async fn test_migration_drops_rejected_items() {
    let harness = Harness::guest();
    for (id, title) in [(1, "A"), (2, "B"), (3, "C")] {
        let _ = harness.coordinator.add_item(WatchItem::movie(id, title, WatchStatus::Want)).await.unwrap();
    }
    harness.remote.reject_insert(ItemKey::movie(2));
    harness.coordinator.switch_identity(Some(user()));

    let migrated = harness.migration().migrate_guest_data(&MigrationDecision::Migrate).await;
    assert_eq!(migrated, 2);

    let keys = harness.partition_keys(WatchStatus::Want);
    assert_eq!(keys, vec![ItemKey::movie(1), ItemKey::movie(3)]);
    assert!(!harness.store.read_flags().has_guest_data);
    assert_eq!(harness.remote.rows("user-1").len(), 2);
}

#[tokio::test]
async fn test_migration_discard_clears_guest_data() {
    let harness = Harness::guest();
    let _ = harness.coordinator.add_item(WatchItem::movie(1, "A", WatchStatus::Want)).await.unwrap();
    harness.coordinator.switch_identity(Some(user()));

    let migrated = harness.migration().migrate_guest_data(&MigrationDecision::Discard).await;
    assert_eq!(migrated, 0);
    assert!(harness.coordinator.collection().is_empty());
    assert!(!harness.store.read_flags().has_guest_data);
    assert_eq!(harness.remote.write_calls(), 0);
}

#[tokio::test]
async fn test_migration_without_flag_is_noop() {
    let harness = Harness::guest();
    harness.coordinator.switch_identity(Some(user()));
    assert_eq!(harness.migration().migrate_guest_data(&MigrationDecision::Migrate).await, 0);
    assert_eq!(harness.remote.write_calls(), 0);
}

#[tokio::test]
async fn test_change_status_on_missing_key() {
    let harness = Harness::guest();
    let _ = harness.coordinator.add_item(WatchItem::movie(1, "A", WatchStatus::Want)).await.unwrap();
    let _ = harness.coordinator.add_item(WatchItem::series(2, "B", WatchStatus::Watching)).await.unwrap();
    let before = harness.coordinator.collection();

    let outcome = harness
        .coordinator
        .change_status(ItemKey::movie(404), WatchStatus::Completed)
        .await
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Skipped(SoftFailure::ItemNotFound));
    assert_eq!(harness.coordinator.collection(), before);
}

#[tokio::test]
async fn test_movie_scenario() {
    let harness = Harness::guest();
    let key = ItemKey::movie(550);

    let added = harness
        .coordinator
        .add_item(WatchItem::movie(550, "Fight Club", WatchStatus::Want))
        .await
        .unwrap();
    assert!(added.is_applied());
    let want = harness.coordinator.query_by_status(WatchStatus::Want);
    assert_eq!(want.len(), 1);
    assert_eq!(want[0].external_id, 550);

    let moved = harness.coordinator.change_status(key, WatchStatus::Watching).await.unwrap();
    assert!(moved.is_applied());
    assert!(harness.coordinator.query_by_status(WatchStatus::Want).is_empty());
    assert_eq!(harness.coordinator.query_by_status(WatchStatus::Watching).len(), 1);

    let progress = harness.coordinator.update_progress(key, 1, 1).await.unwrap();
    assert_eq!(progress, SyncOutcome::Skipped(SoftFailure::NotSeries));
    let item = harness.coordinator.collection().find(&key).cloned().unwrap();
    assert_eq!(item.progress(), None);
}

#[tokio::test]
async fn test_series_progress_write_through() {
    let harness = Harness::guest();
    harness.coordinator.switch_identity(Some(user()));
    let key = ItemKey::series(1399);
    let _ = harness
        .coordinator
        .add_item(WatchItem::series(1399, "Game of Thrones", WatchStatus::Watching))
        .await
        .unwrap();

    let outcome = harness.coordinator.update_progress(key, 3, 0).await.unwrap();
    assert!(outcome.is_applied());

    let local = harness.coordinator.collection().find(&key).cloned().unwrap();
    assert_eq!(local.progress(), Some(Progress::new(3, 1)));
    let remote = harness.remote.rows("user-1");
    assert_eq!(remote[0].progress(), Some(Progress::new(3, 1)));
}

#[tokio::test]
async fn test_rejected_remote_write_leaves_no_trace() {
    let harness = Harness::guest();
    harness.coordinator.switch_identity(Some(user()));
    harness.remote.set_reject_writes(true);
    let item = WatchItem::movie(42, "X", WatchStatus::Want);
    let key = item.key();

    let result = harness.coordinator.add_item(item).await;
    match result {
        Err(SyncError::RemoteWriteFailed { operation, key: failed, .. }) => {
            assert_eq!(operation, "add_item");
            assert_eq!(failed, key);
        }
        other => panic!("expected RemoteWriteFailed, got {:?}", other),
    }
    assert!(!harness.coordinator.collection().contains(&key));
    assert!(harness.remote.rows("user-1").is_empty());
    assert!(!harness.store.read_flags().has_guest_data);
}

#[tokio::test]
async fn test_rejected_status_change_keeps_partition() {
    let harness = Harness::guest();
    harness.coordinator.switch_identity(Some(user()));
    let _ = harness.coordinator.add_item(WatchItem::movie(1, "A", WatchStatus::Want)).await.unwrap();
    harness.remote.set_reject_writes(true);

    let result = harness.coordinator.change_status(ItemKey::movie(1), WatchStatus::Completed).await;
    assert!(result.is_err());
    assert_eq!(harness.coordinator.query_status_of(&ItemKey::movie(1)), Some(WatchStatus::Want));
}

#[tokio::test]
async fn test_remove_missing_item_is_idempotent() {
    let harness = Harness::guest();
    harness.coordinator.switch_identity(Some(user()));
    let outcome = harness.coordinator.remove_item(ItemKey::series(5)).await.unwrap();
    assert!(outcome.is_applied());
}

#[tokio::test]
async fn test_collection_feed_follows_writes() {
    let harness = Harness::guest();
    let sizes = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&sizes);
    let subscription = harness.coordinator.on_collection_changed(move |collection| {
        sink.lock().unwrap().push(collection.len());
    });

    let _ = harness.coordinator.add_item(WatchItem::movie(1, "A", WatchStatus::Want)).await.unwrap();
    let _ = harness.coordinator.add_item(WatchItem::movie(2, "B", WatchStatus::Want)).await.unwrap();
    assert!(subscription.unsubscribe());
    let _ = harness.coordinator.remove_item(ItemKey::movie(1)).await.unwrap();

    assert_eq!(*sizes.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_remote_insert_is_visible_to_other_reader() {
    let harness = Harness::guest();
    harness.coordinator.switch_identity(Some(user()));
    let _ = harness.coordinator.add_item(WatchItem::movie(8, "H", WatchStatus::Want)).await.unwrap();

    let listed = harness.remote.list_all(&user()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key(), ItemKey::movie(8));
}
