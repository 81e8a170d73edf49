use std::sync::atomic::AtomicUsize;

use async_trait::async_trait;
use brandmatch_ai::{AiError, GenerationParams};
use brandmatch_core::{InsightType, PerformanceMetrics, Scores};
use brandmatch_db::{CampaignRow, ContentMap, MemoryContentStore};
use serde_json::{json, Value};

use super::*;
use crate::error::FailureKind;

type Script = dyn Fn(usize, &str) -> Result<String, AiError> + Send + Sync;

/// Generator whose answer is computed from the call index and the prompt,
/// optionally after a per-call delay.
struct ScriptedGenerator {
    calls: AtomicUsize,
    delay: fn(usize) -> Duration,
    script: Box<Script>,
}

impl ScriptedGenerator {
    fn new(script: impl Fn(usize, &str) -> Result<String, AiError> + Send + Sync + 'static) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: |_| Duration::ZERO,
            script: Box::new(script),
        }
    }

    fn with_delay(mut self, delay: fn(usize) -> Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(
        &self,
        prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, AiError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = (self.delay)(index);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.script)(index, prompt)
    }
}

/// Store whose every call fails.
struct BrokenStore;

#[async_trait]
impl ContentStore for BrokenStore {
    async fn save_insight(&self, _: &str, _: &str, _: InsightType, _: &str) -> Result<(), DbError> {
        Err(DbError::NotFound)
    }
    async fn save_strategy(&self, _: &str, _: &str, _: &str) -> Result<(), DbError> {
        Err(DbError::NotFound)
    }
    async fn load_all_insights(&self, _: &str) -> Result<ContentMap, DbError> {
        Err(DbError::NotFound)
    }
    async fn load_all_strategies(&self, _: &str) -> Result<ContentMap, DbError> {
        Err(DbError::NotFound)
    }
    async fn create_campaign(&self, _: Option<&str>, _: &Value) -> Result<CampaignRow, DbError> {
        Err(DbError::NotFound)
    }
    async fn get_campaign(&self, _: &str) -> Result<Option<CampaignRow>, DbError> {
        Err(DbError::NotFound)
    }
    async fn list_campaigns(&self, _: i64) -> Result<Vec<CampaignRow>, DbError> {
        Err(DbError::NotFound)
    }
    async fn save_recommendation_data(&self, _: &str, _: &Value) -> Result<(), DbError> {
        Err(DbError::NotFound)
    }
    async fn delete_campaign(&self, _: &str) -> Result<bool, DbError> {
        Err(DbError::NotFound)
    }
}

fn influencer(username: &str) -> InfluencerRecommendation {
    InfluencerRecommendation {
        username: username.to_string(),
        rank: 1,
        scores: Some(Scores {
            final_score: Some(0.873),
            ..Default::default()
        }),
        performance_metrics: Some(PerformanceMetrics {
            engagement_rate: Some(0.045),
            ..Default::default()
        }),
        insights: Some("Audiens aktif dan suka bertanya.".to_string()),
        ..Default::default()
    }
}

async fn memory_store() -> Arc<MemoryContentStore> {
    let store = Arc::new(MemoryContentStore::new());
    store
        .create_campaign(Some("camp-1"), &json!({ "brand_name": "Avoskin" }))
        .await
        .expect("create campaign");
    store
}

fn orchestrator(
    generator: Arc<ScriptedGenerator>,
    store: Arc<dyn ContentStore>,
) -> Orchestrator {
    Orchestrator::new("camp-1", None, generator, store)
}

#[tokio::test]
async fn bulk_run_launches_five_tasks_per_influencer() {
    let generator = Arc::new(ScriptedGenerator::new(|_, _| Ok("hasil".to_string())));
    let orch = orchestrator(generator.clone(), memory_store().await);

    let summary = orch.run_all(&[influencer("rara"), influencer("dita")]).await;

    assert_eq!(summary.succeeded, 10);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.outcomes.len(), 10);
    assert_eq!(generator.calls(), 10);
    assert_eq!(orch.snapshot().len(), 10);
}

#[tokio::test]
async fn one_failing_task_does_not_affect_the_others() {
    let generator = Arc::new(ScriptedGenerator::new(|_, prompt| {
        if prompt.contains("Analisis performa influencer @dita") {
            Err(AiError::Upstream {
                status: 500,
                body: "internal".to_string(),
            })
        } else {
            Ok("hasil".to_string())
        }
    }));
    let orch = orchestrator(generator, memory_store().await);

    let summary = orch.run_all(&[influencer("rara"), influencer("dita")]).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 9);
    let failed = summary
        .outcomes
        .iter()
        .find(|o| matches!(o.state, TaskState::Failed { .. }))
        .unwrap();
    assert_eq!(failed.key, TaskKey::new("dita", TaskType::PerformanceInsights));
    assert!(matches!(
        failed.state,
        TaskState::Failed {
            kind: FailureKind::Upstream,
            ..
        }
    ));
    assert!(orch
        .state(&TaskKey::new("rara", TaskType::PerformanceInsights))
        .content()
        .is_some());
}

#[tokio::test]
async fn missing_scores_fail_without_calling_the_model() {
    let generator = Arc::new(ScriptedGenerator::new(|_, _| Ok("hasil".to_string())));
    let orch = orchestrator(generator.clone(), memory_store().await);
    let bare = InfluencerRecommendation {
        username: "kosong".to_string(),
        ..Default::default()
    };

    let err = orch.run_one(&bare, TaskType::ScoreInsights).await.unwrap_err();

    assert!(matches!(err, GenerationError::Precondition(_)));
    assert!(err.to_string().contains("data not available for this analysis type"));
    assert_eq!(generator.calls(), 0);
    assert!(matches!(
        orch.state(&TaskKey::new("kosong", TaskType::ScoreInsights)),
        TaskState::Failed {
            kind: FailureKind::Precondition,
            ..
        }
    ));
}

#[tokio::test]
async fn bulk_run_reports_precondition_failures_per_task() {
    let generator = Arc::new(ScriptedGenerator::new(|_, _| Ok("hasil".to_string())));
    let orch = orchestrator(generator.clone(), memory_store().await);
    let bare = InfluencerRecommendation {
        username: "kosong".to_string(),
        ..Default::default()
    };

    let summary = orch.run_all(&[bare]).await;

    // Strategy has no precondition; the four insights do.
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 4);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn regenerating_keeps_one_persisted_record_with_latest_content() {
    let generator = Arc::new(ScriptedGenerator::new(|i, _| Ok(format!("versi {}", i + 1))));
    let store = memory_store().await;
    let orch = orchestrator(generator, store.clone());
    let rara = influencer("rara");

    assert_eq!(orch.run_one(&rara, TaskType::Strategy).await.unwrap(), "versi 1");
    assert_eq!(orch.run_one(&rara, TaskType::Strategy).await.unwrap(), "versi 2");

    let strategies = store.load_all_strategies("camp-1").await.unwrap();
    assert_eq!(strategies.len(), 1);
    assert_eq!(
        strategies[&TaskKey::new("rara", TaskType::Strategy)].content,
        "versi 2"
    );
}

#[tokio::test]
async fn stale_completion_never_overwrites_newer_run() {
    let generator = Arc::new(
        ScriptedGenerator::new(|i, _| Ok(if i == 0 { "lama" } else { "baru" }.to_string()))
            .with_delay(|i| {
                if i == 0 {
                    Duration::from_millis(300)
                } else {
                    Duration::ZERO
                }
            }),
    );
    let store = memory_store().await;
    let orch = Arc::new(orchestrator(generator, store.clone()));
    let rara = influencer("rara");

    let first = {
        let orch = Arc::clone(&orch);
        let rara = rara.clone();
        tokio::spawn(async move { orch.run_one(&rara, TaskType::Strategy).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = orch.run_one(&rara, TaskType::Strategy).await.unwrap();
    let first = first.await.unwrap();

    assert_eq!(second, "baru");
    assert!(matches!(first, Err(GenerationError::Superseded(_))));

    tokio::time::sleep(Duration::from_millis(400)).await;
    let key = TaskKey::new("rara", TaskType::Strategy);
    assert_eq!(orch.state(&key).content(), Some("baru"));
    let strategies = store.load_all_strategies("camp-1").await.unwrap();
    assert_eq!(strategies[&key].content, "baru");
}

#[tokio::test]
async fn slow_generation_times_out() {
    let generator = Arc::new(
        ScriptedGenerator::new(|_, _| Ok("terlambat".to_string()))
            .with_delay(|_| Duration::from_secs(2)),
    );
    let orch = orchestrator(generator, memory_store().await)
        .with_task_timeout(Duration::from_millis(50));

    let err = orch
        .run_one(&influencer("rara"), TaskType::Strategy)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::TimedOut(_)));
    assert!(matches!(
        orch.state(&TaskKey::new("rara", TaskType::Strategy)),
        TaskState::Failed {
            kind: FailureKind::TimedOut,
            ..
        }
    ));
}

#[tokio::test]
async fn storage_failure_does_not_fail_generation() {
    let generator = Arc::new(ScriptedGenerator::new(|_, _| Ok("hasil".to_string())));
    let orch = orchestrator(generator, Arc::new(BrokenStore));

    let content = orch
        .run_one(&influencer("rara"), TaskType::CommentInsights)
        .await
        .unwrap();

    assert_eq!(content, "hasil");
    assert_eq!(
        orch.state(&TaskKey::new("rara", TaskType::CommentInsights))
            .content(),
        Some("hasil")
    );
}

#[tokio::test]
async fn hydrate_marks_persisted_content_as_succeeded() {
    let store = memory_store().await;
    store.save_strategy("camp-1", "rara", "strategi").await.unwrap();
    store
        .save_insight("camp-1", "rara", InsightType::Caption, "caption")
        .await
        .unwrap();
    let generator = Arc::new(ScriptedGenerator::new(|_, _| Ok(String::new())));
    let orch = orchestrator(generator.clone(), store);

    assert_eq!(orch.hydrate().await.unwrap(), 2);

    let snapshot = orch.snapshot();
    assert_eq!(
        snapshot[&TaskKey::new("rara", TaskType::CaptionInsights)].content(),
        Some("caption")
    );
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn hydrate_surfaces_store_errors() {
    let generator = Arc::new(ScriptedGenerator::new(|_, _| Ok(String::new())));
    let orch = orchestrator(generator, Arc::new(BrokenStore));
    assert!(orch.hydrate().await.is_err());
    assert!(orch.snapshot().is_empty());
}

#[tokio::test]
async fn subscribers_see_generating_then_result() {
    let generator = Arc::new(ScriptedGenerator::new(|_, _| Ok("hasil".to_string())));
    let orch = orchestrator(generator, memory_store().await);
    let mut updates = orch.subscribe();

    orch.run_one(&influencer("rara"), TaskType::ScoreInsights)
        .await
        .unwrap();

    let first = updates.recv().await.unwrap();
    assert_eq!(first.key, TaskKey::new("rara", TaskType::ScoreInsights));
    assert_eq!(first.state, TaskState::Generating);
    let second = updates.recv().await.unwrap();
    assert_eq!(
        second.state,
        TaskState::Succeeded {
            content: "hasil".to_string()
        }
    );
}

#[tokio::test]
async fn duplicate_usernames_are_generated_once() {
    let generator = Arc::new(ScriptedGenerator::new(|_, _| Ok("hasil".to_string())));
    let orch = orchestrator(generator.clone(), memory_store().await);

    let summary = orch.run_all(&[influencer("rara"), influencer("rara")]).await;

    assert_eq!(summary.succeeded, 5);
    assert_eq!(generator.calls(), 5);
}

#[tokio::test]
async fn busy_only_while_a_run_is_in_flight() {
    let generator = Arc::new(
        ScriptedGenerator::new(|_, _| Ok("strategi".to_string()))
            .with_delay(|_| Duration::from_millis(200)),
    );
    let orch = Arc::new(orchestrator(generator, memory_store().await));
    assert!(!orch.is_busy());

    let run = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move { orch.run_one(&influencer("rara"), TaskType::Strategy).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orch.is_busy());

    run.await.unwrap().unwrap();
    assert!(!orch.is_busy());
}
