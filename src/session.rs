//! Session data: an app key-value namespace plus the authenticated user.
//!
//! A [`Session`] is a plain value owned by one request. [`SessionStore`] keeps
//! sessions between requests, keyed by the `sid` cookie. Nothing is stored for a
//! visitor until their session holds data, and idle sessions are dropped.

use crate::service::{is_blank, Row};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "sid";

const FLASH_KEY: &str = "message";

/// Idle lifetime of a stored session.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(24 * 60);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    app: Map<String, Value>,
    user: Option<Row>,
}

impl Session {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.app.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.app.insert(key.into(), value);
    }

    pub fn set_many(&mut self, values: Map<String, Value>) {
        self.app.extend(values);
    }

    /// Remove and return a value. Blank values are left in place and reported as absent.
    pub fn pop(&mut self, key: &str) -> Option<Value> {
        match self.app.get(key) {
            Some(v) if !is_blank(v) => self.app.remove(key),
            _ => None,
        }
    }

    pub fn all(&self) -> &Map<String, Value> {
        &self.app
    }

    /// Mark `user` as authenticated for this session.
    pub fn auth(&mut self, user: Row) {
        self.user = Some(user);
    }

    pub fn logout(&mut self) {
        self.user = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.as_ref().map(|u| !u.is_empty()).unwrap_or(false)
    }

    pub fn user(&self) -> Option<&Row> {
        self.user.as_ref()
    }

    /// One column of the authenticated user.
    pub fn user_field(&self, key: &str) -> Option<&Value> {
        self.user.as_ref().and_then(|u| u.get(key))
    }

    pub fn flash(&mut self, message: impl Into<String>) {
        self.set(FLASH_KEY, Value::String(message.into()));
    }

    pub fn take_flash(&mut self) -> Option<String> {
        self.pop(FLASH_KEY).map(|v| crate::service::as_text(&v))
    }

    /// No app values and no user.
    pub fn is_empty(&self) -> bool {
        self.app.is_empty() && self.user.is_none()
    }
}

/// A session fetched from the store.
#[derive(Debug)]
pub struct Loaded {
    pub id: String,
    pub session: Session,
    /// The id named a live stored session. A client holding it already has the cookie.
    pub known: bool,
}

struct Entry {
    session: Session,
    touched: Instant,
}

/// In-process session storage shared by all requests.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
    idle: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle: Duration) -> Self {
        SessionStore {
            inner: Arc::default(),
            idle,
        }
    }

    /// Session for `id`, or a fresh one under a new id. Expired sessions count as unknown.
    pub fn load(&self, id: Option<&str>) -> Loaded {
        if let Some(id) = id {
            let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = map.get(id).filter(|e| e.touched.elapsed() <= self.idle) {
                return Loaded {
                    id: id.to_string(),
                    session: entry.session.clone(),
                    known: true,
                };
            }
        }
        Loaded {
            id: uuid::Uuid::new_v4().simple().to_string(),
            session: Session::default(),
            known: false,
        }
    }

    /// Store `session` under `id` and restart its idle clock. Idle sessions are swept
    /// on the way.
    pub fn save(&self, id: &str, session: Session) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        sweep(&mut map, self.idle);
        map.insert(
            id.to_string(),
            Entry {
                session,
                touched: Instant::now(),
            },
        );
    }

    /// Persist a request's session. An empty session under an id the client never
    /// received is not stored. Returns true when the client must be sent the id.
    pub fn commit(&self, loaded_known: bool, id: &str, session: Session) -> bool {
        if !loaded_known && session.is_empty() {
            return false;
        }
        self.save(id, session);
        !loaded_known
    }

    /// Drop sessions idle longer than the timeout. Returns how many were removed.
    pub fn expire_idle(&self) -> usize {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        sweep(&mut map, self.idle)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sweep(map: &mut HashMap<String, Entry>, idle: Duration) -> usize {
    let before = map.len();
    map.retain(|_, e| e.touched.elapsed() <= idle);
    let removed = before - map.len();
    if removed > 0 {
        tracing::debug!(removed, "idle sessions expired");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn app_values_and_pop() {
        let mut s = Session::default();
        s.set("a", json!(1));
        s.set_many(json!({"b": "x", "c": ""}).as_object().cloned().unwrap());
        assert_eq!(s.all().len(), 3);
        assert_eq!(s.pop("b"), Some(json!("x")));
        assert_eq!(s.pop("b"), None);
        assert_eq!(s.pop("c"), None);
        assert_eq!(s.get("c"), Some(&json!("")));
    }

    #[test]
    fn auth_and_logout() {
        let mut s = Session::default();
        assert!(!s.is_logged_in());
        s.auth(json!({"id": 1, "usertype": "admin"}).as_object().cloned().unwrap());
        assert!(s.is_logged_in());
        assert_eq!(s.user_field("usertype"), Some(&json!("admin")));
        s.logout();
        assert!(s.user().is_none());
    }

    #[test]
    fn flash_is_read_once() {
        let mut s = Session::default();
        s.flash("Welcome back!");
        assert_eq!(s.take_flash().as_deref(), Some("Welcome back!"));
        assert_eq!(s.take_flash(), None);
    }

    #[test]
    fn store_round_trips_by_id() {
        let store = SessionStore::new();
        let Loaded { id, mut session, known } = store.load(None);
        assert!(!known);
        session.set("k", json!("v"));
        store.save(&id, session);
        let loaded = store.load(Some(&id));
        assert!(loaded.known);
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.session.get("k"), Some(&json!("v")));
        let fresh = store.load(Some("unknown"));
        assert!(!fresh.known);
        assert_ne!(fresh.id, "unknown");
        assert!(fresh.session.is_empty());
    }

    #[test]
    fn empty_sessions_of_new_visitors_are_not_stored() {
        let store = SessionStore::new();
        for _ in 0..50 {
            let l = store.load(None);
            assert!(!store.commit(l.known, &l.id, l.session));
        }
        assert!(store.is_empty());

        let mut l = store.load(None);
        l.session.flash("hi");
        assert!(store.commit(l.known, &l.id, l.session));
        assert_eq!(store.len(), 1);

        // A known session stays stored after it empties, and its id is not re-sent.
        let mut again = store.load(Some(&l.id));
        assert_eq!(again.session.take_flash().as_deref(), Some("hi"));
        assert!(!store.commit(again.known, &again.id, again.session));
        assert!(store.load(Some(&l.id)).known);
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::with_idle_timeout(Duration::ZERO);
        let mut s = Session::default();
        s.set("k", json!(1));
        store.save("old", s);
        std::thread::sleep(Duration::from_millis(5));
        assert!(!store.load(Some("old")).known);
        assert_eq!(store.expire_idle(), 1);
        assert!(store.is_empty());
    }
}
