use chrono::Utc;
use reqwest::Method;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::models::HealthStatus;
use crate::orchestrator::{Category, Dispatch, Inner, OpState, Orchestrator, Ticket};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Handle to the background health poll. `stop` waits for the loop to exit;
/// dropping the handle aborts it.
pub struct PollHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Orchestrator {
    /// One health check. Success replaces the stored [`HealthStatus`];
    /// failure is logged and leaves it untouched.
    pub async fn poll_health(&self) -> Dispatch {
        let ticket = self.begin(Category::Health, |_| {}).await;
        self.finish_health(ticket).await
    }

    #[instrument(skip_all)]
    async fn finish_health(&self, ticket: Ticket) -> Dispatch {
        let start_time = std::time::Instant::now();

        let outcome = self
            .inner
            .gateway
            .call("/health", Method::GET, None)
            .await
            .map_err(|e| e.to_string())
            .and_then(|body| {
                serde_json::from_value::<HealthStatus>(body)
                    .map_err(|e| format!("unexpected health payload: {}", e))
            });

        match outcome {
            Ok(health) => {
                debug!(
                    "Health check ok in {:?} (connected: {})",
                    start_time.elapsed(),
                    health.elasticsearch_connected
                );
                self.complete(ticket, |ui| {
                    ui.health = Some(health);
                    ui.last_health_check = Some(Utc::now());
                    ui.set_op(Category::Health, OpState::Succeeded);
                })
                .await
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                self.complete(ticket, |ui| ui.set_op(Category::Health, OpState::Failed))
                    .await
            }
        }
    }

    /// Start polling health now and then every `every`. No-op if already running.
    pub async fn start(&self, every: Duration) {
        let mut poller = self.inner.poller.lock().await;
        if poller.is_some() {
            warn!("Health poll already running");
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(poll_loop(Arc::downgrade(&self.inner), every, stop_rx));
        info!("Health poll started (every {:?})", every);
        *poller = Some(PollHandle {
            stop: Some(stop_tx),
            task: Some(task),
        });
    }

    /// Stop the health poll. Once this returns no further tick fires.
    pub async fn shutdown(&self) {
        let handle = self.inner.poller.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }
}

async fn poll_loop(inner: Weak<Inner>, every: Duration, mut stop: oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }

        // The poll holds only a weak reference between ticks.
        let Some(inner) = inner.upgrade() else { break };
        let orchestrator = Orchestrator { inner };

        let ticket = orchestrator.begin(Category::Health, |_| {}).await;
        tokio::select! {
            biased;
            _ = &mut stop => {
                // The in-flight check is abandoned; don't leave it Pending.
                orchestrator
                    .complete(ticket, |ui| ui.set_op(Category::Health, OpState::Idle))
                    .await;
                break;
            }
            _ = orchestrator.finish_health(ticket) => {}
        }
    }

    info!("Health poll stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::fake::{backend_error, ScriptedGateway};
    use serde_json::json;

    fn health_at(timestamp: &str) -> serde_json::Value {
        json!({
            "elasticsearch": {"connected": true, "timestamp": timestamp},
            "indices": {"segment_docs": {"exists": true, "document_count": 10}}
        })
    }

    #[tokio::test]
    async fn failed_tick_keeps_previous_health() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.reply("/health", Ok(health_at("t1")));
        gateway.reply("/health", Ok(health_at("t2")));
        gateway.reply("/health", Err(backend_error(500, "Health check failed")));
        gateway.reply("/health", Ok(health_at("t4")));
        gateway.reply("/health", Ok(health_at("t5")));
        let orchestrator = Orchestrator::new(gateway.clone());

        for tick in 1..=5 {
            orchestrator.poll_health().await;
            let state = orchestrator.snapshot().await;
            let seen = state.health.as_ref().map(|h| h.timestamp.clone());
            match tick {
                3 => {
                    assert_eq!(seen.as_deref(), Some("t2"));
                    assert_eq!(state.health_op, OpState::Failed);
                }
                _ => assert_eq!(seen, Some(format!("t{}", tick))),
            }
            assert_eq!(state.error, None);
            assert!(!state.busy);
        }
        assert_eq!(gateway.calls_to("/health"), 5);
    }

    #[tokio::test]
    async fn undecodable_health_counts_as_failure() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.reply("/health", Ok(health_at("t1")));
        gateway.reply("/health", Ok(json!({"status": "weird"})));
        let orchestrator = Orchestrator::new(gateway);

        orchestrator.poll_health().await;
        orchestrator.poll_health().await;

        let state = orchestrator.snapshot().await;
        assert_eq!(state.health.unwrap().timestamp, "t1");
        assert_eq!(state.health_op, OpState::Failed);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn slow_tick_does_not_overwrite_newer_tick() {
        let gateway = Arc::new(ScriptedGateway::default());
        let slow = gateway.hold("/health");
        gateway.reply("/health", Ok(health_at("fresh")));
        let orchestrator = Orchestrator::new(gateway.clone());

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.poll_health().await }
        });
        while gateway.calls_to("/health") < 1 {
            tokio::task::yield_now().await;
        }

        assert_eq!(orchestrator.poll_health().await, Dispatch::Applied);
        slow.send(Ok(health_at("stale"))).unwrap();
        assert_eq!(first.await.unwrap(), Dispatch::Stale);

        let state = orchestrator.snapshot().await;
        assert_eq!(state.health.unwrap().timestamp, "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn poll_runs_on_cadence_until_shutdown() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.always("/health", health_at("steady"));
        let orchestrator = Orchestrator::new(gateway.clone());

        orchestrator.start(DEFAULT_POLL_INTERVAL).await;
        tokio::time::sleep(Duration::from_secs(95)).await;
        // Ticks at 0s, 30s, 60s and 90s.
        assert_eq!(gateway.calls_to("/health"), 4);
        assert!(orchestrator.snapshot().await.health.is_some());

        orchestrator.shutdown().await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(gateway.calls_to("/health"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_tick_leaves_health_idle() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.reply("/health", Ok(health_at("t1")));
        let _never_answered = gateway.hold("/health");
        let orchestrator = Orchestrator::new(gateway.clone());
        let mut updates = orchestrator.subscribe();

        orchestrator.start(DEFAULT_POLL_INTERVAL).await;
        updates
            .wait_for(|s| s.health_op == OpState::Succeeded)
            .await
            .unwrap();
        updates
            .wait_for(|s| s.health_op == OpState::Pending)
            .await
            .unwrap();

        orchestrator.shutdown().await;

        let state = orchestrator.snapshot().await;
        assert_eq!(state.health_op, OpState::Idle);
        assert_eq!(state.health.unwrap().timestamp, "t1");
        assert_eq!(*updates.borrow(), orchestrator.snapshot().await);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_ignored() {
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.always("/health", health_at("steady"));
        let orchestrator = Orchestrator::new(gateway.clone());

        orchestrator.start(DEFAULT_POLL_INTERVAL).await;
        orchestrator.start(DEFAULT_POLL_INTERVAL).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(gateway.calls_to("/health"), 1);

        orchestrator.shutdown().await;
    }
}
