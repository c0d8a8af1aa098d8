//! Session state machine tests over the in-memory store and an ephemeral
//! keypair.

use std::sync::{Arc, OnceLock};

use chrono::{Duration, Utc};
use sessiond::crypto::envelope::{Envelope, EnvelopeCipher};
use sessiond::crypto::keys::KeyManager;
use sessiond::error::AppError;
use sessiond::models::session::{NewSession, SessionStatus};
use sessiond::repositories::memory::MemorySessionStore;
use sessiond::repositories::session::SessionStore;
use sessiond::services::sessions::SessionLifecycle;
use uuid::Uuid;

static KEYS: OnceLock<Arc<KeyManager>> = OnceLock::new();

fn test_keys() -> Arc<KeyManager> {
    KEYS.get_or_init(|| Arc::new(KeyManager::ephemeral(2048).unwrap()))
        .clone()
}

fn lifecycle() -> (Arc<MemorySessionStore>, SessionLifecycle) {
    let store = Arc::new(MemorySessionStore::new());
    let cipher = EnvelopeCipher::new(test_keys());
    let lifecycle = SessionLifecycle::new(store.clone() as Arc<dyn SessionStore>, cipher);
    (store, lifecycle)
}

fn new_session(email: &str, nickname: &str) -> NewSession {
    NewSession {
        email: email.to_string(),
        nickname: nickname.to_string(),
        mac_address: "00:1A:2B:3C:4D:5E".to_string(),
        client_ip: "203.0.113.7".to_string(),
        server_ip: "127.0.0.1".to_string(),
    }
}

#[tokio::test]
async fn create_then_get_reports_fresh_metrics() {
    let (_store, lifecycle) = lifecycle();

    let created = lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    let fetched = lifecycle.get(&created.id).await.unwrap();

    assert_eq!(fetched.status, SessionStatus::Active);
    assert!(fetched.idle_seconds <= 1, "fresh session, idle was {}", fetched.idle_seconds);
    assert!(fetched.duration_seconds <= 1);

    let secure = fetched.secure.expect("fields should decrypt");
    assert_eq!(secure.email, "a@b.com");
    assert_eq!(secure.mac_address, "00:1A:2B:3C:4D:5E");
    assert_eq!(secure.client_ip, "203.0.113.7");
    assert_eq!(secure.server_ip, "127.0.0.1");
}

#[tokio::test]
async fn sensitive_fields_are_sealed_at_rest() {
    let (store, lifecycle) = lifecycle();

    let created = lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    let record = store.find_by_id(&created.id).await.unwrap().unwrap();

    assert_ne!(record.email, "a@b.com");
    // What sits in the store is a parseable envelope, not plaintext.
    Envelope::from_wire(&record.email).unwrap();
    Envelope::from_wire(&record.mac_address).unwrap();
    Envelope::from_wire(&record.client_ip).unwrap();
    Envelope::from_wire(&record.server_ip).unwrap();
    // Nickname stays plaintext.
    assert_eq!(record.nickname, "A");
}

#[tokio::test]
async fn touch_resets_idle_session_to_active() {
    let (store, lifecycle) = lifecycle();

    let created = lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    let mut record = store.find_by_id(&created.id).await.unwrap().unwrap();
    record.status = SessionStatus::Idle;
    record.last_accessed = Utc::now() - Duration::seconds(900);
    store.replace(record).await;

    let touched = lifecycle.touch(&created.id).await.unwrap();
    assert_eq!(touched.status, SessionStatus::Active);
    assert!(touched.idle_seconds <= 1, "touch must reset the idle clock");
}

#[tokio::test]
async fn touch_does_not_resurrect_terminated_session() {
    let (store, lifecycle) = lifecycle();

    let created = lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    let mut record = store.find_by_id(&created.id).await.unwrap().unwrap();
    record.status = SessionStatus::UserTerminated;
    store.replace(record).await;

    let touched = lifecycle.touch(&created.id).await.unwrap();
    assert_eq!(touched.status, SessionStatus::UserTerminated);
}

#[tokio::test]
async fn terminate_moves_idle_session_to_user_terminated() {
    let (store, lifecycle) = lifecycle();

    let created = lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    let mut record = store.find_by_id(&created.id).await.unwrap().unwrap();
    record.status = SessionStatus::Idle;
    store.replace(record).await;

    let terminated = lifecycle.terminate(&created.id).await.unwrap();
    assert_eq!(terminated.status, SessionStatus::UserTerminated);
}

#[tokio::test]
async fn unknown_id_returns_not_found_and_store_is_untouched() {
    let (store, lifecycle) = lifecycle();
    lifecycle.create(new_session("a@b.com", "A")).await.unwrap();

    let ghost = Uuid::new_v4();

    assert!(matches!(lifecycle.get(&ghost).await.unwrap_err(), AppError::NotFound));
    assert!(matches!(lifecycle.touch(&ghost).await.unwrap_err(), AppError::NotFound));
    assert!(matches!(lifecycle.terminate(&ghost).await.unwrap_err(), AppError::NotFound));
    assert!(matches!(
        lifecycle.set_status(&ghost, SessionStatus::Idle).await.unwrap_err(),
        AppError::NotFound
    ));

    assert_eq!(store.count().await, 1);
}

#[tokio::test]
async fn set_status_is_an_administrative_override() {
    let (_store, lifecycle) = lifecycle();

    let created = lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    let updated = lifecycle
        .set_status(&created.id, SessionStatus::SystemTerminated)
        .await
        .unwrap();

    assert_eq!(updated.status, SessionStatus::SystemTerminated);
}

#[tokio::test]
async fn listings_split_by_status() {
    let (_store, lifecycle) = lifecycle();

    let first = lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    let _second = lifecycle.create(new_session("c@d.com", "C")).await.unwrap();

    lifecycle.terminate(&first.id).await.unwrap();

    assert_eq!(lifecycle.list_all().await.unwrap().len(), 2);

    let active = lifecycle.list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].secure.as_ref().unwrap().email, "c@d.com");
}

#[tokio::test]
async fn corrupt_record_is_surfaced_not_fatal_in_listings() {
    let (store, lifecycle) = lifecycle();

    let healthy = lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    let corrupt = lifecycle.create(new_session("c@d.com", "C")).await.unwrap();

    let mut record = store.find_by_id(&corrupt.id).await.unwrap().unwrap();
    record.email = "not an envelope".to_string();
    store.replace(record).await;

    let all = lifecycle.list_all().await.unwrap();
    assert_eq!(all.len(), 2, "one corrupt record must not abort the listing");

    let healthy_view = all.iter().find(|v| v.id == healthy.id).unwrap();
    let corrupt_view = all.iter().find(|v| v.id == corrupt.id).unwrap();

    assert_eq!(healthy_view.secure.as_ref().unwrap().email, "a@b.com");
    assert!(corrupt_view.secure.is_none(), "corrupt fields surface as unavailable");
}

#[tokio::test]
async fn get_on_corrupt_record_is_an_error() {
    let (store, lifecycle) = lifecycle();

    let created = lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    let mut record = store.find_by_id(&created.id).await.unwrap().unwrap();
    record.mac_address = "not an envelope".to_string();
    store.replace(record).await;

    let err = lifecycle.get(&created.id).await.unwrap_err();
    assert!(matches!(err, AppError::Decryption(_)));
}

#[tokio::test]
async fn purge_all_removes_everything() {
    let (store, lifecycle) = lifecycle();

    lifecycle.create(new_session("a@b.com", "A")).await.unwrap();
    lifecycle.create(new_session("c@d.com", "C")).await.unwrap();

    assert_eq!(lifecycle.purge_all().await.unwrap(), 2);
    assert_eq!(store.count().await, 0);
}
