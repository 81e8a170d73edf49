//! Keyed generation state for one campaign session.
//!
//! Every start for a key takes a fresh token and aborts whatever run held the
//! key before. A completion is applied only while its token is still the
//! latest for that key, so a slow earlier run can never overwrite a newer
//! result.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use brandmatch_ai::TextGenerator;
use brandmatch_core::{CampaignContext, InfluencerRecommendation, TaskKey, TaskType};
use brandmatch_db::{ContentStore, DbError};
use futures::future::{join_all, AbortHandle, Abortable};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::GenerationError;
use crate::generate::generate_for_task;
use crate::state::{TaskState, TaskUpdate};

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(90);

const UPDATE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct Slot {
    state: TaskState,
    token: u64,
    abort: Option<AbortHandle>,
}

/// Final state of one task from a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub key: TaskKey,
    pub state: TaskState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Runs that a newer run for the same key replaced mid-flight.
    pub superseded: usize,
    pub outcomes: Vec<TaskOutcome>,
}

pub struct Orchestrator {
    campaign_id: String,
    campaign: Option<CampaignContext>,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn ContentStore>,
    task_timeout: Duration,
    slots: Mutex<HashMap<TaskKey, Slot>>,
    next_token: AtomicU64,
    updates: broadcast::Sender<TaskUpdate>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        campaign_id: impl Into<String>,
        campaign: Option<CampaignContext>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            campaign_id: campaign_id.into(),
            campaign,
            generator,
            store,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            slots: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            updates,
        }
    }

    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    #[must_use]
    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    /// Receives every state change from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TaskUpdate> {
        self.updates.subscribe()
    }

    /// Current state of every key the session has seen.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<TaskKey, TaskState> {
        self.lock()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.state.clone()))
            .collect()
    }

    /// True while any key has a run in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock()
            .values()
            .any(|slot| matches!(slot.state, TaskState::Generating))
    }

    #[must_use]
    pub fn state(&self, key: &TaskKey) -> TaskState {
        self.lock()
            .get(key)
            .map(|slot| slot.state.clone())
            .unwrap_or_default()
    }

    /// Marks every persisted strategy and insight of the campaign as
    /// succeeded. Keys with a run in flight are left alone. Returns the
    /// number of keys loaded.
    ///
    /// # Errors
    ///
    /// Returns the store error if either batch load fails; nothing is
    /// applied in that case.
    pub async fn hydrate(&self) -> Result<usize, DbError> {
        let (strategies, insights) = tokio::try_join!(
            self.store.load_all_strategies(&self.campaign_id),
            self.store.load_all_insights(&self.campaign_id),
        )?;

        let mut applied = Vec::new();
        {
            let mut slots = self.lock();
            for (key, stored) in strategies.into_iter().chain(insights) {
                let slot = slots.entry(key.clone()).or_default();
                if slot.state.is_generating() {
                    continue;
                }
                slot.state = TaskState::Succeeded {
                    content: stored.content,
                };
                applied.push(TaskUpdate {
                    key,
                    state: slot.state.clone(),
                });
            }
        }

        let count = applied.len();
        for update in applied {
            self.publish(update);
        }
        tracing::info!(campaign_id = %self.campaign_id, count, "hydrated generation state");
        Ok(count)
    }

    /// Runs one task for one influencer, replacing any run in flight for the
    /// same key. On success the content is written through to the store; a
    /// failed write is logged and does not fail the run.
    ///
    /// # Errors
    ///
    /// Returns the [`GenerationError`] the task failed with, or
    /// [`GenerationError::Superseded`] when a newer run took the key.
    pub async fn run_one(
        &self,
        influencer: &InfluencerRecommendation,
        task: TaskType,
    ) -> Result<String, GenerationError> {
        let key = TaskKey::new(influencer.username.clone(), task);
        let (token, registration) = self.begin(&key);
        let started = Instant::now();

        let run = Abortable::new(self.generate_and_persist(influencer, task), registration);
        let Ok(result) = run.await else {
            tracing::debug!(key = %key, token, "generation aborted by a newer run");
            return Err(GenerationError::Superseded(key.to_string()));
        };

        if !self.finish(&key, token, &result) {
            tracing::debug!(key = %key, token, "discarding stale generation result");
            return Err(GenerationError::Superseded(key.to_string()));
        }

        match &result {
            Ok(content) => tracing::info!(
                campaign_id = %self.campaign_id,
                key = %key,
                chars = content.len(),
                latency_ms = started.elapsed().as_millis(),
                "generation succeeded"
            ),
            Err(e) => tracing::warn!(
                campaign_id = %self.campaign_id,
                key = %key,
                kind = ?e.kind(),
                error = %e,
                "generation failed"
            ),
        }
        result
    }

    /// Runs all five tasks for every influencer concurrently. One failure
    /// never cancels the others. Duplicate usernames are skipped.
    pub async fn run_all(&self, influencers: &[InfluencerRecommendation]) -> GenerationSummary {
        let mut seen = HashSet::new();
        let unique: Vec<&InfluencerRecommendation> = influencers
            .iter()
            .filter(|inf| {
                let fresh = seen.insert(inf.username.as_str());
                if !fresh {
                    tracing::warn!(username = %inf.username, "skipping duplicate influencer");
                }
                fresh
            })
            .collect();

        tracing::info!(
            campaign_id = %self.campaign_id,
            influencers = unique.len(),
            tasks = unique.len() * TaskType::ALL.len(),
            "starting bulk generation"
        );

        let runs = unique.iter().flat_map(|influencer| {
            TaskType::ALL.into_iter().map(move |task| async move {
                let key = TaskKey::new(influencer.username.clone(), task);
                (key, self.run_one(influencer, task).await)
            })
        });
        let results = join_all(runs).await;

        let mut summary = GenerationSummary::default();
        for (key, result) in results {
            let state = match result {
                Ok(content) => {
                    summary.succeeded += 1;
                    TaskState::Succeeded { content }
                }
                Err(GenerationError::Superseded(_)) => {
                    summary.superseded += 1;
                    continue;
                }
                Err(e) => {
                    summary.failed += 1;
                    TaskState::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };
            summary.outcomes.push(TaskOutcome { key, state });
        }

        if summary.failed > 0 {
            tracing::warn!(
                campaign_id = %self.campaign_id,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "bulk generation finished with failures"
            );
        } else {
            tracing::info!(
                campaign_id = %self.campaign_id,
                succeeded = summary.succeeded,
                "bulk generation finished"
            );
        }
        summary
    }

    async fn generate_and_persist(
        &self,
        influencer: &InfluencerRecommendation,
        task: TaskType,
    ) -> Result<String, GenerationError> {
        let generation = generate_for_task(
            self.generator.as_ref(),
            influencer,
            task,
            self.campaign.as_ref(),
        );
        let content = tokio::time::timeout(self.task_timeout, generation)
            .await
            .map_err(|_| GenerationError::TimedOut(self.task_timeout.as_secs()))??;

        if let Err(e) = self
            .store
            .save_content(&self.campaign_id, &influencer.username, task.content_kind(), &content)
            .await
        {
            tracing::warn!(
                campaign_id = %self.campaign_id,
                username = %influencer.username,
                task = %task,
                error = %e,
                "failed to persist generated content"
            );
        }
        Ok(content)
    }

    /// Takes the key for a new run: issues a token, aborts the previous run
    /// and publishes `Generating`.
    fn begin(&self, key: &TaskKey) -> (u64, futures::future::AbortRegistration) {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (handle, registration) = AbortHandle::new_pair();
        {
            let mut slots = self.lock();
            let slot = slots.entry(key.clone()).or_default();
            if let Some(previous) = slot.abort.replace(handle) {
                previous.abort();
            }
            slot.token = token;
            slot.state = TaskState::Generating;
        }
        self.publish(TaskUpdate {
            key: key.clone(),
            state: TaskState::Generating,
        });
        (token, registration)
    }

    /// Applies a completion if `token` still owns the key.
    fn finish(&self, key: &TaskKey, token: u64, result: &Result<String, GenerationError>) -> bool {
        let state = match result {
            Ok(content) => TaskState::Succeeded {
                content: content.clone(),
            },
            Err(e) => TaskState::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        };
        {
            let mut slots = self.lock();
            let Some(slot) = slots.get_mut(key).filter(|slot| slot.token == token) else {
                return false;
            };
            slot.state = state.clone();
            slot.abort = None;
        }
        self.publish(TaskUpdate {
            key: key.clone(),
            state,
        });
        true
    }

    fn publish(&self, update: TaskUpdate) {
        // No subscribers is fine.
        let _ = self.updates.send(update);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
