use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::alert_service::AlertAppService;

/// Drive the periodic reconciliation cycle until shutdown.
///
/// Not re-entrant: the next cycle is scheduled `interval` after the
/// previous one fully completes, publishes and persistence included, so a
/// slow bus stretches the cadence instead of stacking overlapping cycles.
pub async fn run_reconcile_loop(
    service: Arc<AlertAppService>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tracing::info!(interval_ms = interval.as_millis() as u64, "reconciliation loop started");
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
        service.reconcile_cycle(Utc::now()).await;
    }
    tracing::debug!("reconciliation loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::alert::event::{AlertEvent, LifecycleEvent};
    use domain::alert::sla::SlaTier;
    use ports::test_utils::{InMemoryStateStore, NoopMetrics, RecordingPublisher};

    fn make_service(publisher: Arc<RecordingPublisher>) -> Arc<AlertAppService> {
        Arc::new(AlertAppService::new(
            publisher,
            Arc::new(InMemoryStateStore::new()),
            Arc::new(NoopMetrics),
            "factory",
        ))
    }

    fn make_event(id: &str) -> LifecycleEvent {
        LifecycleEvent {
            id: id.to_string(),
            name: "Jam".to_string(),
            category: "Mechanical".to_string(),
            location: "L1".to_string(),
            actor: "alice".to_string(),
            timestamp: Some(Utc::now()),
            sla_tier: SlaTier::Normal,
        }
    }

    #[tokio::test]
    async fn loop_cycles_until_cancelled() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = make_service(publisher.clone());
        service
            .handle_event(AlertEvent::Raise(make_event("A1")))
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_reconcile_loop(
            service.clone(),
            Duration::from_millis(10),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.cancel();
        handle.await.unwrap();

        // At least a few cycles ran: each one republished the active
        // record and emitted a liveness marker.
        assert!(publisher.liveness_count() >= 2);
        assert!(publisher.published().len() >= 3);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_cycle() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = make_service(publisher.clone());

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        run_reconcile_loop(service, Duration::from_secs(3600), shutdown).await;

        assert_eq!(publisher.liveness_count(), 0);
    }
}
