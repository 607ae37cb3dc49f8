//! Behaviour every session store backend must share.

use std::sync::Arc;
use std::time::Duration;

use sessionvault::history::HistoryLimits;
use sessionvault::sessions::{
    create_session_store, CacheClient, MemoryCache, OpContext, Role, SessionData, SessionError, SessionStore,
    StoreOptions, StoreType,
};

fn backends() -> Vec<Arc<dyn SessionStore>> {
    let _ = sessionvault::observability::init_tracing("sessionvault=debug");
    let cache: Arc<dyn CacheClient> = Arc::new(MemoryCache::new());
    vec![
        Arc::from(create_session_store(StoreType::Memory, StoreOptions::default()).unwrap()),
        Arc::from(
            create_session_store(
                StoreType::Redis,
                StoreOptions::default()
                    .with_cache_client(cache)
                    .with_ttl(Duration::from_secs(3600)),
            )
            .unwrap(),
        ),
    ]
}

fn ctx() -> OpContext {
    OpContext::background()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[tokio::test]
async fn create_then_get_starts_at_version_one() {
    for store in backends() {
        let id = new_id();
        let mut data = SessionData::new(&id);
        data.version = 17;
        store.create(&ctx(), &mut data).await.unwrap();

        let fetched = store.get(&ctx(), &id).await.unwrap().unwrap();
        assert_eq!(fetched.version, 1, "{}", store.name());
        assert_eq!(fetched.created_at, fetched.updated_at, "{}", store.name());
    }
}

#[tokio::test]
async fn sequential_updates_increment_version() {
    const N: i64 = 5;
    for store in backends() {
        let id = new_id();
        let mut data = SessionData::new(&id);
        store.create(&ctx(), &mut data).await.unwrap();

        for i in 0..N {
            let mut current = store.get(&ctx(), &id).await.unwrap().unwrap();
            current.push_turn(Role::User, format!("turn {i}"), &HistoryLimits::default());
            store.update(&ctx(), &mut current).await.unwrap();
            assert_eq!(current.version, i + 2);
        }

        let last = store.get(&ctx(), &id).await.unwrap().unwrap();
        assert_eq!(last.version, 1 + N, "{}", store.name());
        assert_eq!(last.conversation_history.len(), 5);
        assert!(last.updated_at >= last.created_at);
    }
}

#[tokio::test]
async fn racing_updates_have_exactly_one_winner() {
    for store in backends() {
        let id = new_id();
        let mut data = SessionData::new(&id);
        store.create(&ctx(), &mut data).await.unwrap();

        let mut alice = store.get(&ctx(), &id).await.unwrap().unwrap();
        let mut bob = store.get(&ctx(), &id).await.unwrap().unwrap();
        alice.system_prompt = "alice".into();
        bob.system_prompt = "bob".into();

        store.update(&ctx(), &mut alice).await.unwrap();
        let err = store.update(&ctx(), &mut bob).await.unwrap_err();
        assert!(err.is_version_conflict(), "{}: {err}", store.name());
        assert_eq!(bob.version, 1);

        let mut retry = store.get(&ctx(), &id).await.unwrap().unwrap();
        assert_eq!(retry.version, 2);
        retry.system_prompt = "bob".into();
        store.update(&ctx(), &mut retry).await.unwrap();

        let stored = store.get(&ctx(), &id).await.unwrap().unwrap();
        assert_eq!(stored.version, 3);
        assert_eq!(stored.system_prompt, "bob");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_read_modify_write_loses_no_turns() {
    const WRITERS: usize = 8;
    let limits = HistoryLimits {
        max_messages: 100,
        max_tokens: 10_000,
    };

    for store in backends() {
        let id = new_id();
        let mut data = SessionData::new(&id);
        store.create(&ctx(), &mut data).await.unwrap();

        let mut handles = Vec::new();
        for writer in 0..WRITERS {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let mut conflicts = 0usize;
                loop {
                    let mut current = store.get(&ctx(), &id).await.unwrap().unwrap();
                    current.push_turn(Role::Assistant, format!("writer {writer}"), &limits);
                    match store.update(&ctx(), &mut current).await {
                        Ok(()) => return conflicts,
                        Err(e) if e.is_version_conflict() => conflicts += 1,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let last = store.get(&ctx(), &id).await.unwrap().unwrap();
        assert_eq!(last.version, 1 + WRITERS as i64, "{}", store.name());
        assert_eq!(last.conversation_history.len(), WRITERS);
    }
}

#[tokio::test]
async fn update_on_unknown_id_is_not_found() {
    for store in backends() {
        let mut data = SessionData::new(new_id());
        data.version = 1;
        let err = store.update(&ctx(), &mut data).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)), "{}: {err}", store.name());
    }
}

#[tokio::test]
async fn get_on_unknown_id_is_none() {
    for store in backends() {
        assert!(store.get(&ctx(), &new_id()).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn delete_is_final_and_idempotent() {
    for store in backends() {
        let id = new_id();
        let mut data = SessionData::new(&id);
        store.create(&ctx(), &mut data).await.unwrap();
        store.delete(&ctx(), &id).await.unwrap();
        store.delete(&ctx(), &id).await.unwrap();

        assert!(store.get(&ctx(), &id).await.unwrap().is_none());
        let mut stale = data.clone();
        assert!(store.update(&ctx(), &mut stale).await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn stored_record_round_trips_every_field() {
    for store in backends() {
        let id = new_id();
        let mut data = SessionData::new(&id);
        data.system_prompt = "Only answer from the catalogue.".into();
        data.language = "uk".into();
        data.tts_enabled = true;
        data.add_keyterm("Київ");
        data.allowed_origins = vec!["https://a.example".into()];
        data.rate_limits.insert("rpm".into(), serde_json::json!(12));
        data.config.insert("voice".into(), serde_json::json!({"id": "v1", "speed": 1.25}));
        data.push_turn(Role::User, "Привіт", &HistoryLimits::default());
        store.create(&ctx(), &mut data).await.unwrap();

        let fetched = store.get(&ctx(), &id).await.unwrap().unwrap();
        assert_eq!(fetched, data, "{}", store.name());
    }
}

#[tokio::test]
async fn expired_deadline_fails_every_operation() {
    for store in backends() {
        let expired = OpContext::background().with_timeout(Duration::ZERO);
        let mut data = SessionData::new(new_id());
        assert!(matches!(
            store.create(&expired, &mut data).await,
            Err(SessionError::DeadlineExceeded)
        ));
        assert!(store.get(&expired, &data.id).await.unwrap_err().is_cancellation());
        data.version = 1;
        let before = data.clone();
        assert!(store.update(&expired, &mut data).await.unwrap_err().is_cancellation());
        assert_eq!(data, before);
        assert!(store.delete(&expired, &data.id).await.unwrap_err().is_cancellation());
    }
}
