use pomodoro_focus_rs::state_token::generate_token;
use pomodoro_focus_rs::store::{COUNT_KEY, STATE_TOKEN_KEY};
use pomodoro_focus_rs::{FileStore, KeyValueStore, MemoryStore, StateTokenManager};
use pomodoro_focus_rs::FocusError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps a store and counts writes.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FocusError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
}

fn temp_store_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("focus-store-{}.json", uuid::Uuid::new_v4()))
}

#[test]
fn test_generated_token_shape() {
    let token = generate_token(40);
    assert_eq!(token.len(), 40);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));

    // 62^40 possibilities; a collision here means the generator is broken
    assert_ne!(generate_token(40), generate_token(40));
    assert_eq!(generate_token(0), "");
}

#[test]
fn test_token_created_once() {
    let store = Arc::new(MemoryStore::new());
    let tokens = StateTokenManager::new(store.clone(), 40);
    assert_eq!(tokens.current(), None);

    let first = tokens.get_or_create_token().unwrap();
    let second = tokens.get_or_create_token().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 40);
    assert_eq!(store.get(STATE_TOKEN_KEY), Some(first.clone()));
    assert_eq!(tokens.current(), Some(first));
}

#[test]
fn test_existing_token_reused() {
    let store = Arc::new(MemoryStore::with_values([(STATE_TOKEN_KEY, "previously-stored")]));
    let tokens = StateTokenManager::new(store.clone(), 40);

    assert_eq!(tokens.get_or_create_token().unwrap(), "previously-stored");
    assert_eq!(store.len(), 1);
}

#[test]
fn test_empty_stored_token_replaced() {
    let store = Arc::new(MemoryStore::with_values([(STATE_TOKEN_KEY, "")]));
    let tokens = StateTokenManager::new(store.clone(), 12);

    let token = tokens.get_or_create_token().unwrap();
    assert_eq!(token.len(), 12);
    assert_eq!(store.get(STATE_TOKEN_KEY), Some(token));
}

#[test]
fn test_file_store_survives_reopen() {
    let path = temp_store_path();
    {
        let store = FileStore::open(&path).unwrap();
        assert!(store.get(STATE_TOKEN_KEY).is_none());
        store.set(STATE_TOKEN_KEY, "abc123").unwrap();
        store.set(COUNT_KEY, "2").unwrap();
        store.set(COUNT_KEY, "3").unwrap();
        assert_eq!(store.path(), path.as_path());
    }

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.get(STATE_TOKEN_KEY).as_deref(), Some("abc123"));
    assert_eq!(reopened.get(COUNT_KEY).as_deref(), Some("3"));

    let tokens = StateTokenManager::new(Arc::new(reopened), 40);
    assert_eq!(tokens.get_or_create_token().unwrap(), "abc123");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_file_store_rejects_corrupt_file() {
    let path = temp_store_path();
    std::fs::write(&path, b"{ definitely not json").unwrap();

    let result = FileStore::open(&path);
    assert!(result.is_err());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_zero_length_token_written_once() {
    let store = Arc::new(CountingStore::default());
    let tokens = StateTokenManager::new(store.clone(), 0);

    let first = tokens.get_or_create_token().unwrap();
    assert_eq!(first.len(), 1);
    for _ in 0..5 {
        assert_eq!(tokens.get_or_create_token().unwrap(), first);
    }
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_file_store_failed_write_not_visible() {
    let missing_dir = std::env::temp_dir().join(format!("focus-missing-{}", uuid::Uuid::new_v4()));
    let store = FileStore::open(missing_dir.join("store.json")).unwrap();

    let result = store.set(COUNT_KEY, "7");
    assert!(matches!(result, Err(FocusError::IoError(_))));
    assert_eq!(store.get(COUNT_KEY), None);
}
