//! Registration commits against the SQLite catalog

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cinelist::db::CatalogStore;
use cinelist::error::{CommitError, StoreError};
use cinelist::services::committer::{IdGenerator, MAX_INSERT_ATTEMPTS};
use cinelist::services::RegistrationCommitter;
use helpers::*;

fn scripted_ids(ids: &'static [&'static str]) -> IdGenerator {
    let next = Arc::new(AtomicUsize::new(0));
    Arc::new(move || {
        let i = next.fetch_add(1, Ordering::SeqCst);
        ids[i.min(ids.len() - 1)].to_string()
    })
}

fn heat_provider() -> StubProvider {
    StubProvider::new().with_details_for(&[raw(949, "Heat", Some(1995), 40.0)])
}

#[tokio::test]
async fn test_concurrent_commits_insert_once() {
    let store = memory_store().await;
    let provider = Arc::new(heat_provider().with_details_gate(2));
    let committer = RegistrationCommitter::new(provider, store.clone());

    let (a, b) = tokio::join!(committer.commit(949), committer.commit(949));

    let (winner, loser) = match (a, b) {
        (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
        other => panic!("expected one success and one failure, got {:?}", other),
    };
    let CommitError::Duplicate(existing) = loser else {
        panic!("expected duplicate, got {:?}", loser);
    };
    assert_eq!(existing.id, winner.record.id);
    assert_eq!(existing.title, "Heat");
    assert_eq!(store.list_recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_external_id_race_is_reported_as_duplicate() {
    let inner = memory_store().await;
    seed(&inner, "f00d01", 949, "Heat", 1995).await;
    let store = Arc::new(LatePrecheckStore::new(inner.clone()));
    let committer = RegistrationCommitter::new(Arc::new(heat_provider()), store);

    let err = committer.commit(949).await.unwrap_err();

    let CommitError::Duplicate(existing) = err else {
        panic!("expected duplicate, got {:?}", err);
    };
    assert_eq!(existing.id, "f00d01");
    assert_eq!(inner.list_recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_internal_id_collision_is_retried() {
    let store = memory_store().await;
    seed(&store, "aaaaaa", 1, "Other", 2000).await;
    let committer = RegistrationCommitter::with_id_generator(
        Arc::new(heat_provider()),
        store.clone(),
        scripted_ids(&["aaaaaa", "aaaaaa", "bbbbbb"]),
    );

    let registration = committer.commit(949).await.unwrap();

    assert_eq!(registration.record.id, "bbbbbb");
    assert_eq!(registration.record.external_id, Some(949));
    assert_eq!(registration.genres_locale.as_deref(), Some("en"));
}

#[tokio::test]
async fn test_persistent_id_collision_is_a_storage_error() {
    let store = memory_store().await;
    seed(&store, "aaaaaa", 1, "Other", 2000).await;
    let generated = Arc::new(AtomicUsize::new(0));
    let counter = generated.clone();
    let committer = RegistrationCommitter::with_id_generator(
        Arc::new(heat_provider()),
        store.clone(),
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "aaaaaa".to_string()
        }),
    );

    let err = committer.commit(949).await.unwrap_err();

    assert!(matches!(err, CommitError::Storage(StoreError::InternalIdCollision(_))));
    assert_eq!(generated.load(Ordering::SeqCst), MAX_INSERT_ATTEMPTS);
    assert!(!store.exists_by_external_id(949).await.unwrap());
}

#[tokio::test]
async fn test_missing_details_abort_before_storage() {
    let store = memory_store().await;
    let committer = RegistrationCommitter::new(Arc::new(StubProvider::new()), store.clone());

    let err = committer.commit(949).await.unwrap_err();

    assert!(matches!(err, CommitError::NoReleaseDate));
    assert!(store.list_recent(10).await.unwrap().is_empty());
}
