use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use crate::accounts::repo_types::User;

const TOKEN_LEN: usize = 48;

struct Entry {
    user: User,
    last_seen: Instant,
}

/// In-process session store: opaque token -> snapshot of the user taken
/// at bind time. Sessions expire after `idle_ttl` without activity;
/// both `bind` and `resolve` count as activity (sliding timeout).
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Bind a fresh session to `user`, returning the token the client
    /// carries in its cookie. Entries whose cookie was abandoned would
    /// otherwise linger forever, so every bind also sweeps out sessions
    /// past the idle timeout.
    pub fn bind(&self, user: User) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        sessions.retain(|_, entry| entry.last_seen.elapsed() < self.idle_ttl);
        debug!(user_id = %user.id, "session bound");
        sessions.insert(
            token.clone(),
            Entry {
                user,
                last_seen: Instant::now(),
            },
        );
        token
    }

    /// Look up the user bound to `token`, refreshing its idle timer.
    /// An expired session is dropped and treated as absent.
    pub fn resolve(&self, token: &str) -> Option<User> {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        let expired = match sessions.get_mut(token) {
            Some(entry) => {
                if entry.last_seen.elapsed() < self.idle_ttl {
                    entry.last_seen = Instant::now();
                    return Some(entry.user.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            sessions.remove(token);
            debug!("session expired");
        }
        None
    }

    /// Destroy the session immediately; subsequent resolves return none.
    pub fn destroy(&self, token: &str) {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        if sessions.remove(token).is_some() {
            debug!("session destroyed");
        }
    }
}

#[cfg(test)]
impl SessionStore {
    fn len(&self) -> usize {
        self.sessions.read().expect("session lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::groups::AccessGroups;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "A".into(),
            last_name: "L".into(),
            login: "alice".into(),
            email: "a@x.com".into(),
            hash: "$argon2id$fake".into(),
            access_groups: AccessGroups::signup_default(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn bind_then_resolve_returns_snapshot() {
        let store = SessionStore::new(Duration::from_secs(60));
        let user = sample_user();
        let token = store.bind(user.clone());
        let resolved = store.resolve(&token).expect("session should be active");
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.login, "alice");
    }

    #[test]
    fn unknown_token_resolves_to_none() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.resolve("no-such-token").is_none());
    }

    #[test]
    fn destroy_removes_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.bind(sample_user());
        store.destroy(&token);
        assert!(store.resolve(&token).is_none());
    }

    #[test]
    fn idle_session_expires() {
        let store = SessionStore::new(Duration::from_millis(10));
        let token = store.bind(sample_user());
        std::thread::sleep(Duration::from_millis(25));
        assert!(store.resolve(&token).is_none());
    }

    #[test]
    fn resolve_refreshes_idle_timer() {
        let store = SessionStore::new(Duration::from_millis(60));
        let token = store.bind(sample_user());
        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(25));
            assert!(store.resolve(&token).is_some());
        }
    }

    #[test]
    fn bind_evicts_sessions_that_expired_unresolved() {
        let store = SessionStore::new(Duration::from_millis(10));
        for _ in 0..20 {
            store.bind(sample_user());
        }
        std::thread::sleep(Duration::from_millis(25));
        // None of the 20 abandoned tokens is ever resolved again; the
        // next bind alone must reclaim them.
        let token = store.bind(sample_user());
        assert_eq!(store.len(), 1);
        assert!(store.resolve(&token).is_some());
    }

    #[test]
    fn bind_keeps_active_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        let first = store.bind(sample_user());
        let second = store.bind(sample_user());
        assert_eq!(store.len(), 2);
        assert!(store.resolve(&first).is_some());
        assert!(store.resolve(&second).is_some());
    }

    #[test]
    fn tokens_are_distinct() {
        let store = SessionStore::new(Duration::from_secs(60));
        let a = store.bind(sample_user());
        let b = store.bind(sample_user());
        assert_ne!(a, b);
    }
}
