//! Session storage and management.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use dashmap::{mapref::entry::Entry, DashMap};
use serde_json::Value;

use super::{IdGenerator, RandomIdGenerator, SessionId};
use crate::error::RouterError;
use crate::Result;

/// Default idle timeout (30 minutes).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Attempts at drawing a non-colliding identifier before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Server-side state bound to one client.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    created_at: Instant,
    last_accessed: Instant,
    max_inactive: Duration,
    attributes: HashMap<String, Value>,
    invalidated: bool,
}

impl Session {
    fn new(id: SessionId, max_inactive: Duration) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_accessed: now,
            max_inactive,
            attributes: HashMap::new(),
            invalidated: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    /// Idle time after which the session expires.
    pub fn max_inactive_interval(&self) -> Duration {
        self.max_inactive
    }

    pub fn set_max_inactive_interval(&mut self, interval: Duration) {
        self.max_inactive = interval;
    }

    /// Get the idle duration since last access.
    pub fn idle_duration(&self) -> Duration {
        self.last_accessed.elapsed()
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Set an attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_accessed) > self.max_inactive
    }
}

/// Reference to a live session, scoped to the request that resolved it.
///
/// All access goes through the session's own lock, so concurrent requests
/// on the same session are serialized while different sessions never
/// contend. Once the session is invalidated or expired, every accessor
/// fails with [`RouterError::SessionInvalidated`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    fn new(id: SessionId, inner: Arc<Mutex<Session>>) -> Self {
        Self { id, inner }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    fn lock(&self) -> Result<MutexGuard<'_, Session>> {
        let session = self.inner.lock().map_err(|_| RouterError::LockPoisoned)?;
        if session.invalidated {
            return Err(RouterError::SessionInvalidated(self.id.to_string()));
        }
        Ok(session)
    }

    /// Run `f` with exclusive access to the session.
    ///
    /// Use this for read-modify-write sequences such as counters. `f` must
    /// not call back into the owning [`SessionStore`].
    pub fn with<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut session = self.lock()?;
        Ok(f(&mut session))
    }

    /// Get a clone of an attribute value.
    pub fn attribute(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.attribute(name).cloned())
    }

    pub fn set_attribute(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        Ok(self.lock()?.set_attribute(name, value))
    }

    pub fn remove_attribute(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.remove_attribute(name))
    }

    pub fn created_at(&self) -> Result<Instant> {
        Ok(self.lock()?.created_at)
    }

    pub fn last_accessed(&self) -> Result<Instant> {
        Ok(self.lock()?.last_accessed)
    }

    pub fn set_max_inactive_interval(&self, interval: Duration) -> Result<()> {
        self.lock()?.set_max_inactive_interval(interval);
        Ok(())
    }
}

/// Outcome of [`SessionStore::resolve`].
#[derive(Debug, Clone)]
pub struct Resolved {
    pub session: SessionHandle,
    /// `true` when the session was created by this call.
    pub is_new: bool,
}

/// Thread-safe storage for sessions.
///
/// The table is a sharded map from identifier to a per-session lock, so
/// requests for different sessions proceed in parallel.
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<Mutex<Session>>>,
    generator: Box<dyn IdGenerator>,
    idle_timeout: Duration,
}

impl SessionStore {
    /// Create a store using the CSPRNG-backed generator.
    pub fn new(idle_timeout: Duration) -> Self {
        Self::with_generator(idle_timeout, Box::new(RandomIdGenerator))
    }

    /// Create a store with a custom identifier generator.
    pub fn with_generator(idle_timeout: Duration, generator: Box<dyn IdGenerator>) -> Self {
        Self {
            sessions: DashMap::new(),
            generator,
            idle_timeout,
        }
    }

    /// Idle timeout given to new sessions.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Resolve the session named by `requested`, or create a new one.
    ///
    /// A requested identifier that is malformed, unknown, invalidated or
    /// expired is treated as absent. The returned session has been committed
    /// to the table by the time this returns.
    pub fn resolve(&self, requested: Option<&str>) -> Result<Resolved> {
        if let Some(id) = requested.and_then(SessionId::parse) {
            if let Some(session) = self.lookup(&id)? {
                return Ok(Resolved {
                    session,
                    is_new: false,
                });
            }
        }

        Ok(Resolved {
            session: self.create()?,
            is_new: true,
        })
    }

    /// Look up a live session and refresh its last-access time.
    ///
    /// An expired session found here is removed and reported as absent.
    pub fn lookup(&self, id: &SessionId) -> Result<Option<SessionHandle>> {
        let Some(entry) = self.sessions.get(id).map(|e| Arc::clone(e.value())) else {
            return Ok(None);
        };

        let expired = {
            let mut session = entry.lock().map_err(|_| RouterError::LockPoisoned)?;
            if session.invalidated {
                return Ok(None);
            }
            if session.is_expired(Instant::now()) {
                true
            } else {
                session.touch();
                false
            }
        };

        if expired {
            tracing::debug!(session = %id, "session expired on access");
            self.discard(id, &entry);
            return Ok(None);
        }

        Ok(Some(SessionHandle::new(id.clone(), entry)))
    }

    /// Create and insert a new session.
    pub fn create(&self) -> Result<SessionHandle> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.generator.generate();
            match self.sessions.entry(id.clone()) {
                Entry::Occupied(_) => {
                    tracing::warn!("session identifier collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    let inner = Arc::new(Mutex::new(Session::new(id.clone(), self.idle_timeout)));
                    slot.insert(Arc::clone(&inner));
                    tracing::debug!(session = %id, "session created");
                    return Ok(SessionHandle::new(id, inner));
                }
            }
        }

        Err(RouterError::IdSpaceExhausted(MAX_ID_ATTEMPTS))
    }

    /// Remove a session.
    ///
    /// Returns `true` if the session existed. Handles still held by
    /// in-flight requests become unusable.
    pub fn invalidate(&self, id: &SessionId) -> bool {
        match self.sessions.remove(id) {
            Some((_, inner)) => {
                mark_invalidated(&inner);
                tracing::debug!(session = %id, "session invalidated");
                true
            }
            None => false,
        }
    }

    /// Check if a live entry exists for the identifier.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Get the number of sessions in the table.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Remove every session idle longer than its timeout.
    ///
    /// Sessions locked by an in-flight request are skipped; they are either
    /// refreshed by that request or picked up by the next sweep.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();

        self.sessions.retain(|_, inner| match inner.try_lock() {
            Ok(session) if session.is_expired(now) => {
                expired.push(Arc::clone(inner));
                false
            }
            Ok(_) | Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(_)) => false,
        });

        for inner in &expired {
            mark_invalidated(inner);
        }

        if !expired.is_empty() {
            tracing::debug!(removed = expired.len(), "swept expired sessions");
        }
        expired.len()
    }

    fn discard(&self, id: &SessionId, entry: &Arc<Mutex<Session>>) {
        if self
            .sessions
            .remove_if(id, |_, current| Arc::ptr_eq(current, entry))
            .is_some()
        {
            mark_invalidated(entry);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

fn mark_invalidated(inner: &Mutex<Session>) {
    if let Ok(mut session) = inner.lock() {
        session.invalidated = true;
    }
}
