// ⏱️ Scheduler - retry-driving tick loop
//
// Every tick runs the registered passes in order (categories first, then
// months), each under its own bounded retry. A pass that exhausts its
// attempts is reported and the tick moves on; the next tick starts fresh.
//
// Ticks run inline in the interval loop, so a slow tick (for example one
// sitting in retry delays) delays the next one instead of overlapping it.

use crate::categorizer::CategoryLinker;
use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::linker::MonthLinker;
use crate::registry::CategoryNameRegistry;
use crate::report::{PassOutcome, PassReport, TickReport};
use crate::retry::RetryPolicy;
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// One full sweep over currently-unlinked records.
#[async_trait]
pub trait SyncPass: Send + Sync {
    fn name(&self) -> &str;

    /// Run the whole pass; `attempt` is 1-based within the current tick.
    async fn run(&self, attempt: u32) -> SyncResult<PassReport>;
}

// ============================================================================
// STATUS BOARD
// ============================================================================

/// Snapshot of scheduler progress, shared with the status server.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub started_at: DateTime<Utc>,
    pub ticks_completed: u64,
    pub last_tick: Option<TickReport>,
}

#[derive(Debug, Clone)]
pub struct StatusBoard {
    inner: Arc<RwLock<SyncStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        StatusBoard {
            inner: Arc::new(RwLock::new(SyncStatus {
                started_at: Utc::now(),
                ticks_completed: 0,
                last_tick: None,
            })),
        }
    }

    pub async fn snapshot(&self) -> SyncStatus {
        self.inner.read().await.clone()
    }

    async fn publish(&self, report: TickReport) {
        let mut status = self.inner.write().await;
        status.ticks_completed += 1;
        status.last_tick = Some(report);
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

pub struct Scheduler {
    passes: Vec<Arc<dyn SyncPass>>,
    retry: RetryPolicy,
    tick_interval: Duration,
    status: StatusBoard,
    ticks: u64,
}

impl Scheduler {
    pub fn new(passes: Vec<Arc<dyn SyncPass>>, retry: RetryPolicy, tick_interval: Duration) -> Self {
        Scheduler {
            passes,
            retry,
            tick_interval,
            status: StatusBoard::new(),
            ticks: 0,
        }
    }

    /// Wire the category and month passes against `store` from `config`.
    pub fn from_config(config: &Config, store: Arc<dyn RecordStore>, registry: CategoryNameRegistry) -> Self {
        let categories = CategoryLinker::new(
            store.clone(),
            registry,
            &config.transactions_database_id,
            &config.categories_database_id,
        )
        .with_recheck(config.recheck_category_before_write);
        let months = MonthLinker::new(store, &config.transactions_database_id, &config.months_database_id);

        let passes: Vec<Arc<dyn SyncPass>> = vec![
            Arc::new(categories) as Arc<dyn SyncPass>,
            Arc::new(months) as Arc<dyn SyncPass>,
        ];
        Self::new(
            passes,
            config.retry.clone().into(),
            config.tick_interval,
        )
    }

    /// Handle for reading progress from another task.
    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass once, in order, each with its own retry budget.
    pub async fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let started_at = Utc::now();
        let mut passes = Vec::with_capacity(self.passes.len());

        for pass in &self.passes {
            let name = pass.name().to_string();
            let outcome = match self.retry.execute(&name, |attempt| pass.run(attempt)).await {
                Ok(report) => PassOutcome::Succeeded(report),
                Err(SyncError::RetryExhausted { pass, attempts, last_error }) => {
                    error!(pass = %pass, attempts, error = %last_error, "Pass abandoned for this tick");
                    PassOutcome::Exhausted {
                        pass,
                        attempts,
                        error: last_error.to_string(),
                    }
                }
                Err(other) => {
                    error!(pass = %name, error = %other, "Pass failed");
                    PassOutcome::Exhausted {
                        pass: name,
                        attempts: 1,
                        error: other.to_string(),
                    }
                }
            };
            passes.push(outcome);
        }

        let report = TickReport {
            tick: self.ticks,
            passes,
            started_at,
            finished_at: Utc::now(),
        };
        if report.all_succeeded() {
            info!("{}", report.summary());
        } else {
            warn!("{}", report.summary());
        }

        self.status.publish(report.clone()).await;
        report
    }

    /// Tick on a fixed interval until `shutdown` resolves.
    ///
    /// Shutdown is only observed between ticks; an in-flight tick is never
    /// cut short.
    pub async fn run_until<S>(mut self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        info!(
            passes = ?self.pass_names(),
            interval_secs = self.tick_interval.as_secs_f64(),
            "Scheduler started"
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        info!(ticks = self.ticks, "Scheduler stopped");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CATEGORY_PROPERTY, MONTH_PROPERTY, MONTH_TEXT_PROPERTY, NAME_PROPERTY};
    use crate::store::{InMemoryStore, PropertyValue, Record};
    use std::sync::Mutex;

    /// Fails the first `failures` runs, records every call in a shared log.
    struct ScriptedPass {
        name: &'static str,
        failures: u32,
        log: Arc<Mutex<Vec<(String, u32)>>>,
    }

    #[async_trait]
    impl SyncPass for ScriptedPass {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, attempt: u32) -> SyncResult<PassReport> {
            let calls = {
                let mut log = self.log.lock().unwrap();
                log.push((self.name.to_string(), attempt));
                log.iter().filter(|(n, _)| n == self.name).count() as u32
            };
            if calls <= self.failures {
                return Err(SyncError::remote("query database", "rate_limited"));
            }
            Ok(PassReport::start(self.name, attempt).finish())
        }
    }

    fn scripted(name: &'static str, failures: u32, log: &Arc<Mutex<Vec<(String, u32)>>>) -> Arc<dyn SyncPass> {
        Arc::new(ScriptedPass {
            name,
            failures,
            log: log.clone(),
        })
    }

    #[tokio::test]
    async fn test_tick_runs_passes_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new(
            vec![scripted("categories", 0, &log), scripted("months", 0, &log)],
            RetryPolicy::new(10, Duration::ZERO),
            Duration::from_secs(5),
        );

        let report = scheduler.tick().await;

        assert!(report.all_succeeded());
        assert_eq!(report.tick, 1);
        let order: Vec<String> = log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(order, vec!["categories", "months"]);
    }

    #[tokio::test]
    async fn test_retry_then_success_counts_attempts() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new(
            vec![scripted("categories", 3, &log)],
            RetryPolicy::new(10, Duration::ZERO),
            Duration::from_secs(5),
        );

        let report = scheduler.tick().await;

        match &report.passes[0] {
            PassOutcome::Succeeded(pass) => assert_eq!(pass.attempt, 4),
            other => panic!("expected success, got {other:?}"),
        }
        let attempts: Vec<u32> = log.lock().unwrap().iter().map(|(_, a)| *a).collect();
        assert_eq!(attempts, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_exhausted_pass_does_not_stop_tick() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new(
            vec![scripted("categories", u32::MAX, &log), scripted("months", 0, &log)],
            RetryPolicy::new(10, Duration::ZERO),
            Duration::from_secs(5),
        );
        let status = scheduler.status();

        let report = scheduler.tick().await;

        assert!(matches!(
            report.passes[0],
            PassOutcome::Exhausted { attempts: 10, .. }
        ));
        assert!(report.passes[1].is_success());
        let category_calls = log.lock().unwrap().iter().filter(|(n, _)| n == "categories").count();
        assert_eq!(category_calls, 10);

        // Next tick starts with a fresh budget
        scheduler.tick().await;
        let category_calls = log.lock().unwrap().iter().filter(|(n, _)| n == "categories").count();
        assert_eq!(category_calls, 20);

        let snapshot = status.snapshot().await;
        assert_eq!(snapshot.ticks_completed, 2);
        assert_eq!(snapshot.last_tick.map(|t| t.tick), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_ticks_on_interval() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = Scheduler::new(
            vec![scripted("months", 0, &log)],
            RetryPolicy::new(10, Duration::from_secs(5)),
            Duration::from_secs(5),
        );
        let status = scheduler.status();

        // First tick fires immediately, then at 5s and 10s
        scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(12_500)))
            .await;

        assert_eq!(status.snapshot().await.ticks_completed, 3);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_from_config_links_end_to_end() {
        let config = Config::from_lookup(|key| {
            let value = match key {
                "NOTION_TOKEN" => Some("secret"),
                "DATABASE_1" => Some("11111111-1111-4111-8111-111111111111"),
                "DATABASE_2" => Some("22222222-2222-4222-8222-222222222222"),
                "DATABASE_3" => Some("33333333-3333-4333-8333-333333333333"),
                "SYNC_RETRY_DELAY_SECS" => Some("0"),
                _ => None,
            };
            value.map(str::to_string)
        })
        .unwrap();

        let store = Arc::new(InMemoryStore::new());
        store
            .insert(
                &config.transactions_database_id,
                Record::new("T1")
                    .with_property(NAME_PROPERTY, PropertyValue::title("Groceries"))
                    .with_property(MONTH_TEXT_PROPERTY, PropertyValue::formula_text("2024-01"))
                    .with_property(MONTH_PROPERTY, PropertyValue::relation(&[]))
                    .with_property(CATEGORY_PROPERTY, PropertyValue::relation(&[])),
            )
            .await;
        store
            .insert(
                &config.months_database_id,
                Record::new("M1").with_property(MONTH_TEXT_PROPERTY, PropertyValue::formula_text("2024-01")),
            )
            .await;
        store
            .insert(
                &config.categories_database_id,
                Record::new("C1").with_property(NAME_PROPERTY, PropertyValue::title("Groceries")),
            )
            .await;

        let mut scheduler = Scheduler::from_config(&config, store.clone(), CategoryNameRegistry::with_defaults());
        assert_eq!(scheduler.pass_names(), vec!["categories", "months"]);

        // One failure in the first pass is absorbed by the retry
        store.fail_next(1).await;
        let report = scheduler.tick().await;

        assert!(report.all_succeeded());
        assert_eq!(report.total_linked(), 2);
        let t1 = store.get("T1").await.unwrap();
        assert_eq!(t1.relation_ids(CATEGORY_PROPERTY), vec!["C1"]);
        assert_eq!(t1.relation_ids(MONTH_PROPERTY), vec!["M1"]);

        // Updates happen category first, then month
        let order: Vec<String> = store
            .updates()
            .await
            .into_iter()
            .map(|(_, a)| a[0].property().to_string())
            .collect();
        assert_eq!(order, vec![CATEGORY_PROPERTY, MONTH_PROPERTY]);
    }
}
