//! One generation orchestrator per campaign, created on first use and
//! dropped after sitting idle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use brandmatch_assist::Orchestrator;

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

struct Entry {
    session: Arc<Orchestrator>,
    last_used: Instant,
}

impl Entry {
    /// Idle past `ttl` with nobody holding the session and no run in flight.
    fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_used) >= ttl
            && Arc::strong_count(&self.session) == 1
            && !self.session.is_busy()
    }
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Entry>>,
    idle_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_SESSION_IDLE)
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Returns the session for `campaign_id`, building it with `build` when
    /// none exists. A fresh session is hydrated from storage before it is
    /// returned; a hydration failure is logged and the session starts empty.
    ///
    /// Every call first drops sessions that have been idle longer than the
    /// configured TTL.
    pub async fn get_or_start(
        &self,
        campaign_id: &str,
        build: impl FnOnce() -> Orchestrator,
    ) -> Arc<Orchestrator> {
        let (session, created) = {
            let mut sessions = self.lock();
            let now = Instant::now();
            self.sweep(&mut sessions, now);

            if let Some(entry) = sessions.get_mut(campaign_id) {
                entry.last_used = now;
                (Arc::clone(&entry.session), false)
            } else {
                let session = Arc::new(build());
                sessions.insert(
                    campaign_id.to_owned(),
                    Entry {
                        session: Arc::clone(&session),
                        last_used: now,
                    },
                );
                (session, true)
            }
        };

        if created {
            match session.hydrate().await {
                Ok(loaded) => tracing::info!(campaign_id, loaded, "generation session started"),
                Err(e) => tracing::warn!(
                    campaign_id,
                    error = %e,
                    "could not hydrate generation session; starting empty"
                ),
            }
        }

        session
    }

    /// Drops the session so the next use rebuilds it with fresh campaign
    /// context. Runs already in flight finish against the old session.
    pub fn end(&self, campaign_id: &str) -> bool {
        self.lock().remove(campaign_id).is_some()
    }

    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.lock().len()
    }

    fn sweep(&self, sessions: &mut HashMap<String, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_stale(now, self.idle_ttl));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(
                evicted,
                remaining = sessions.len(),
                "dropped idle generation sessions"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
