//! Server-side sessions. The browser only holds a random token in a signed
//! cookie; the session itself lives in a moka cache and expires after
//! `SESSION_LIFETIME_SECS` of inactivity.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::NaiveDateTime;
use moka::future::Cache;
use std::time::Duration;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i32,
    pub created_at: NaiveDateTime,
}

pub type SessionStore = Cache<String, Session>;

pub fn new_store(lifetime: Duration) -> SessionStore {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_idle(lifetime)
        .support_invalidation_closures()
        .build()
}

/// Registers a session for `user_id` and returns its token.
pub async fn start(store: &SessionStore, user_id: i32) -> String {
    let token = Uuid::new_v4().to_string();
    let session = Session {
        user_id,
        created_at: common::kyiv_now(),
    };
    store.insert(token.clone(), session).await;
    token
}

pub async fn end(store: &SessionStore, token: &str) {
    store.invalidate(token).await;
}

/// Drops every session of a user, e.g. after the account was deleted.
pub fn end_all_for_user(store: &SessionStore, user_id: i32) {
    // only fails when the store was built without invalidation closures
    let _ = store.invalidate_entries_if(move |_, session| session.user_id == user_id);
}

pub fn cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_and_end_session() {
        let store = new_store(Duration::from_secs(60));
        let token = start(&store, 7).await;
        assert_eq!(store.get(&token).await.map(|s| s.user_id), Some(7));

        end(&store, &token).await;
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_session_expires_when_idle() {
        let store = new_store(Duration::from_millis(100));
        let token = start(&store, 1).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = new_store(Duration::from_secs(60));
        let first = start(&store, 1).await;
        let second = start(&store, 1).await;
        assert_ne!(first, second);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = cookie("token".to_string(), true);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
