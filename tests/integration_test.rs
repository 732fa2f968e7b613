//! Integration tests for sessionkit

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sessionkit::prelude::*;
use sessionkit::{MessagePackSerializer, RedisBackend, TOKEN_HEADER};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const KEY: &[u8] = b"test_secret_key_32_bytes_long!!!";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Profile {
    name: String,
    admin: bool,
}

/// Redis backend over a plain map, enough for end-to-end flows.
#[derive(Default)]
struct MapBackend {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl RedisBackend for MapBackend {
    async fn get(&self, key: &str) -> SessionResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, _seconds: u64) -> SessionResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> SessionResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn del(&self, key: &str) -> SessionResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// First cookie for `name` out of a response, stripped of its attributes.
fn cookie_value(response: &SessionResponse, name: &str) -> String {
    let prefix = format!("{}=", name);
    response
        .cookies()
        .iter()
        .find_map(|cookie| {
            cookie
                .strip_prefix(&prefix)
                .map(|rest| rest.split(';').next().unwrap_or("").to_string())
        })
        .expect("response carries no session cookie")
}

/// Visit-counter flow: three requests, each replaying the previous cookie.
async fn count_three_visits(store: Arc<dyn SessionStore>) {
    let registry = SessionRegistry::new("sid").register("sid", store);

    let request = SessionRequest::new();
    let mut response = SessionResponse::new();
    let mut manager = registry.manager(&request).unwrap();
    let visits: i64 = manager.get("visits").await.unwrap_or(0);
    assert_eq!(visits, 0);
    manager.set("visits", visits + 1).await.unwrap();
    manager.save(&mut response).await.unwrap();
    let mut cookie = cookie_value(&response, "sid");

    for previous in 1..3 {
        let request = SessionRequest::new().with_cookie("sid", &cookie);
        let mut response = SessionResponse::new();
        let mut manager = registry.manager(&request).unwrap();
        let visits: i64 = manager.get("visits").await.unwrap_or(0);
        assert_eq!(visits, previous);
        manager.set("visits", visits + 1).await.unwrap();
        manager.save(&mut response).await.unwrap();
        cookie = cookie_value(&response, "sid");
    }
}

#[tokio::test]
async fn test_cookie_store_counts_visits() {
    count_three_visits(Arc::new(CookieStore::new(&[KEY]).unwrap())).await;
}

#[tokio::test]
async fn test_memory_store_counts_visits() {
    count_three_visits(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn test_jwt_store_counts_visits() {
    count_three_visits(Arc::new(JwtStore::new(KEY).unwrap())).await;
}

#[tokio::test]
async fn test_redis_store_counts_visits() {
    let store = RedisStore::from_backend(Arc::new(MapBackend::default()));
    count_three_visits(Arc::new(store)).await;
}

#[tokio::test]
async fn test_redis_store_with_messagepack_counts_visits() {
    let store = RedisStore::from_backend(Arc::new(MapBackend::default()))
        .with_serializer(Arc::new(MessagePackSerializer));
    count_three_visits(Arc::new(store)).await;
}

#[tokio::test]
async fn test_typed_values_roundtrip() {
    let registry =
        SessionRegistry::new("sid").register("sid", Arc::new(CookieStore::new(&[KEY]).unwrap()));

    let request = SessionRequest::new();
    let mut response = SessionResponse::new();
    let mut manager = registry.manager(&request).unwrap();
    manager
        .set(
            "profile",
            Profile {
                name: "alice".to_string(),
                admin: true,
            },
        )
        .await
        .unwrap();
    manager.save(&mut response).await.unwrap();
    let cookie = cookie_value(&response, "sid");

    let request = SessionRequest::new().with_cookie("sid", &cookie);
    let mut manager = registry.manager(&request).unwrap();
    let profile: Profile = manager.get("profile").await.unwrap();
    assert_eq!(
        profile,
        Profile {
            name: "alice".to_string(),
            admin: true,
        }
    );
}

#[tokio::test]
async fn test_registry_routes_by_name() {
    let registry = SessionRegistry::new("sid")
        .register("sid", Arc::new(MemoryStore::new()))
        .register("flash", Arc::new(CookieStore::new(&[KEY]).unwrap()));

    let request = SessionRequest::new();
    let mut response = SessionResponse::new();

    let mut main = registry.manager(&request).unwrap();
    main.set("user", "alice").await.unwrap();
    main.save(&mut response).await.unwrap();

    let mut flash = registry.manager_named(&request, "flash").unwrap();
    flash.set("notice", "saved").await.unwrap();
    flash.save(&mut response).await.unwrap();

    assert_eq!(response.cookies().len(), 2);
    assert!(!cookie_value(&response, "sid").is_empty());
    assert!(!cookie_value(&response, "flash").is_empty());
    assert!(registry.manager_named(&request, "missing").is_err());
}

#[tokio::test]
async fn test_destroy_clears_backend_state() {
    let store = Arc::new(MemoryStore::new());
    let registry = SessionRegistry::new("sid").register("sid", store.clone());

    let request = SessionRequest::new();
    let mut response = SessionResponse::new();
    let mut manager = registry.manager(&request).unwrap();
    manager.set("user", "alice").await.unwrap();
    manager.save(&mut response).await.unwrap();
    assert_eq!(store.len().await, 1);
    let cookie = cookie_value(&response, "sid");

    // Logout on the follow-up request.
    let request = SessionRequest::new().with_cookie("sid", &cookie);
    let mut response = SessionResponse::new();
    let mut manager = registry.manager(&request).unwrap();
    manager.destroy(&mut response).await.unwrap();

    assert!(store.is_empty().await);
    assert!(response.cookies()[0].contains("Max-Age=0"));

    // Replaying the dead cookie finds nothing.
    let request = SessionRequest::new().with_cookie("sid", &cookie);
    let mut manager = registry.manager(&request).unwrap();
    assert!(manager.get::<String>("user").await.is_none());
}

#[tokio::test]
async fn test_garbage_cookie_still_yields_working_session() {
    let registry =
        SessionRegistry::new("sid").register("sid", Arc::new(CookieStore::new(&[KEY]).unwrap()));

    let request = SessionRequest::new().with_cookie("sid", "tampered.cookie.value");
    let mut response = SessionResponse::new();
    let mut manager = registry.manager(&request).unwrap();

    assert!(manager.get::<String>("user").await.is_none());
    assert!(manager.load_error().is_some());

    manager.set("user", "alice").await.unwrap();
    manager.save(&mut response).await.unwrap();
    assert_eq!(response.cookies().len(), 1);
}

#[tokio::test]
async fn test_key_rotation_keeps_sessions_alive() {
    // First deployment signs with the old key.
    let first = SessionRegistry::new("sid").register(
        "sid",
        Arc::new(CookieStore::new(&[b"old_secret_key_32_bytes_long!!!!"]).unwrap()),
    );
    let request = SessionRequest::new();
    let mut response = SessionResponse::new();
    let mut manager = first.manager(&request).unwrap();
    manager.set("user", "alice").await.unwrap();
    manager.save(&mut response).await.unwrap();
    let cookie = cookie_value(&response, "sid");

    // Second deployment rotates in a new key but still lists the old one.
    let second = SessionRegistry::new("sid").register(
        "sid",
        Arc::new(
            CookieStore::new(&[
                b"new_secret_key_32_bytes_long!!!!",
                b"old_secret_key_32_bytes_long!!!!",
            ])
            .unwrap(),
        ),
    );
    let request = SessionRequest::new().with_cookie("sid", &cookie);
    let mut response = SessionResponse::new();
    let mut manager = second.manager(&request).unwrap();
    assert_eq!(
        manager.get::<String>("user").await,
        Some("alice".to_string())
    );
    manager.set("seen", true).await.unwrap();
    manager.save(&mut response).await.unwrap();
    let cookie = cookie_value(&response, "sid");

    // Third deployment drops the old key; the refreshed cookie still works.
    let third = SessionRegistry::new("sid").register(
        "sid",
        Arc::new(CookieStore::new(&[b"new_secret_key_32_bytes_long!!!!"]).unwrap()),
    );
    let request = SessionRequest::new().with_cookie("sid", &cookie);
    let mut manager = third.manager(&request).unwrap();
    assert_eq!(
        manager.get::<String>("user").await,
        Some("alice".to_string())
    );
    assert!(manager.load_error().is_none());
}

#[tokio::test]
async fn test_jwt_flow_over_authorization_header() {
    let registry =
        SessionRegistry::new("sid").register("sid", Arc::new(JwtStore::new(KEY).unwrap()));

    let request = SessionRequest::new();
    let mut response = SessionResponse::new();
    let mut manager = registry.manager(&request).unwrap();
    manager.set("user", "alice").await.unwrap();
    manager.save(&mut response).await.unwrap();

    let token = response.header(TOKEN_HEADER).unwrap().to_string();

    // An API client replays the token without any cookie.
    let request =
        SessionRequest::new().with_header("Authorization", format!("Bearer {}", token));
    let mut manager = registry.manager(&request).unwrap();
    assert_eq!(
        manager.get::<String>("user").await,
        Some("alice".to_string())
    );
}

#[tokio::test]
async fn test_read_only_request_sets_no_cookie() {
    let registry = SessionRegistry::new("sid").register("sid", Arc::new(MemoryStore::new()));

    let request = SessionRequest::new();
    let mut response = SessionResponse::new();
    let mut manager = registry.manager(&request).unwrap();

    let _: Option<String> = manager.get("user").await;
    manager.save(&mut response).await.unwrap();

    assert!(response.cookies().is_empty());
}
