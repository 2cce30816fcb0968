//! Session storage for runtime game state.
//!
//! Sessions are kept in a concurrent map and expire after an idle TTL.
//! Expired entries are invisible to `load` but only removed by
//! `cleanup_expired()`, which the server calls on a timer.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use escaperoom_domain::SessionState;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::infrastructure::ports::{ClockPort, SessionId, SessionStoreError, SessionStorePort};

/// Default idle TTL (2 hours).
pub const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 2 * 60 * 60;

struct StoredSession {
    state: SessionState,
    touched_at: DateTime<Utc>,
}

/// Concurrent in-memory implementation of [`SessionStorePort`].
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, StoredSession>,
    idle_ttl: Duration,
    clock: Arc<dyn ClockPort>,
}

impl InMemorySessionStore {
    pub fn new(idle_ttl: std::time::Duration, clock: Arc<dyn ClockPort>) -> Self {
        let idle_ttl = Duration::from_std(idle_ttl)
            .unwrap_or_else(|_| Duration::seconds(DEFAULT_SESSION_IDLE_TTL_SECS as i64));
        Self {
            sessions: DashMap::new(),
            idle_ttl,
            clock,
        }
    }

    fn is_expired(&self, touched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(touched_at) >= self.idle_ttl
    }

    /// Remove sessions idle past the TTL and return how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, stored| !self.is_expired(stored.touched_at, now));
        before.saturating_sub(self.sessions.len())
    }

    /// Number of stored sessions, including expired ones not yet cleaned.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStorePort for InMemorySessionStore {
    async fn load(&self, id: SessionId) -> Result<Option<SessionState>, SessionStoreError> {
        let now = self.clock.now();
        Ok(self
            .sessions
            .get(&id)
            .filter(|stored| !self.is_expired(stored.touched_at, now))
            .map(|stored| stored.state.clone()))
    }

    async fn save(&self, id: SessionId, state: &SessionState) -> Result<(), SessionStoreError> {
        self.sessions.insert(
            id,
            StoredSession {
                state: state.clone(),
                touched_at: self.clock.now(),
            },
        );
        Ok(())
    }

    async fn flush(&self, id: SessionId) -> Result<(), SessionStoreError> {
        self.sessions.remove(&id);
        Ok(())
    }
}

/// Serializes turns per session so two requests never interleave on one state.
#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the session.
    pub async fn acquire(&self, id: SessionId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on. Returns how many were removed.
    pub fn cleanup_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::MockClockPort;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock whose time can be advanced from the test.
    struct SteppingClock {
        base: DateTime<Utc>,
        offset_secs: AtomicI64,
    }

    impl SteppingClock {
        fn new() -> Self {
            Self {
                base: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
                offset_secs: AtomicI64::new(0),
            }
        }

        fn advance(&self, secs: i64) {
            self.offset_secs.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl ClockPort for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            self.base + Duration::seconds(self.offset_secs.load(Ordering::SeqCst))
        }
    }

    fn state_with_theme(theme: &str) -> SessionState {
        let mut state = SessionState::with_welcome("Welcome");
        state.select_theme(theme);
        state
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let mut clock = MockClockPort::new();
        clock.expect_now().returning(Utc::now);
        let store = InMemorySessionStore::new(std::time::Duration::from_secs(60), Arc::new(clock));
        let id = SessionId::new();

        store.save(id, &state_with_theme("Castle")).await.unwrap();

        let loaded = store.load(id).await.unwrap().unwrap();
        assert_eq!(loaded.current_theme(), Some("Castle"));
    }

    #[tokio::test]
    async fn unknown_session_loads_none() {
        let store = InMemorySessionStore::new(
            std::time::Duration::from_secs(60),
            Arc::new(FixedClock(Utc::now())),
        );
        assert!(store.load(SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn flush_removes_session() {
        let store = InMemorySessionStore::new(
            std::time::Duration::from_secs(60),
            Arc::new(SteppingClock::new()),
        );
        let id = SessionId::new();
        store.save(id, &state_with_theme("Castle")).await.unwrap();

        store.flush(id).await.unwrap();

        assert!(store.load(id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn idle_sessions_expire_and_are_cleaned() {
        let clock = Arc::new(SteppingClock::new());
        let store = InMemorySessionStore::new(std::time::Duration::from_secs(60), clock.clone());
        let stale = SessionId::new();
        let fresh = SessionId::new();

        store.save(stale, &state_with_theme("Castle")).await.unwrap();
        clock.advance(30);
        store.save(fresh, &state_with_theme("Space Station")).await.unwrap();
        clock.advance(30);

        assert!(store.load(stale).await.unwrap().is_none());
        assert!(store.load(fresh).await.unwrap().is_some());

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn saving_refreshes_idle_timer() {
        let clock = Arc::new(SteppingClock::new());
        let store = InMemorySessionStore::new(std::time::Duration::from_secs(60), clock.clone());
        let id = SessionId::new();

        store.save(id, &state_with_theme("Castle")).await.unwrap();
        clock.advance(45);
        store.save(id, &state_with_theme("Castle")).await.unwrap();
        clock.advance(45);

        assert!(store.load(id).await.unwrap().is_some());
        assert_eq!(store.cleanup_expired(), 0);
    }

    #[tokio::test]
    async fn held_locks_survive_cleanup() {
        let locks = SessionLocks::new();
        let held = SessionId::new();
        let released = SessionId::new();

        let guard = locks.acquire(held).await;
        drop(locks.acquire(released).await);

        assert_eq!(locks.cleanup_idle(), 1);
        drop(guard);
        assert_eq!(locks.cleanup_idle(), 1);
    }

    #[tokio::test]
    async fn second_acquire_waits_for_first() {
        let locks = Arc::new(SessionLocks::new());
        let id = SessionId::new();

        let guard = locks.acquire(id).await;
        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };

        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }
}
