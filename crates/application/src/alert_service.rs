use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use domain::alert::entity::AlertRecord;
use domain::alert::error::AlertError;
use domain::alert::event::AlertEvent;
use domain::alert::registry::AlertRegistry;
use ports::secondary::message_publisher::MessagePublisher;
use ports::secondary::metrics_port::{CycleMetrics, EventMetrics, MetricsPort, PublishMetrics};
use ports::secondary::state_store::StateStore;

/// Alert lifecycle application service.
///
/// Owns the registry behind a single mutex; the event dispatcher and the
/// reconciliation loop both go through this type and never see the lock.
/// The lock covers map operations only: every publish and every
/// persistence call happens against a cloned record after release, so a
/// slow bus can never stall inbound event handling. A record may change
/// again before its publish completes; the next reconciliation cycle
/// republishes the latest state.
pub struct AlertAppService {
    registry: Mutex<AlertRegistry>,
    publisher: Arc<dyn MessagePublisher>,
    store: Arc<dyn StateStore>,
    metrics: Arc<dyn MetricsPort>,
    /// Topic prefix: records publish under `{application}/alerts/...`.
    application: String,
}

impl AlertAppService {
    pub fn new(
        publisher: Arc<dyn MessagePublisher>,
        store: Arc<dyn StateStore>,
        metrics: Arc<dyn MetricsPort>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            registry: Mutex::new(AlertRegistry::new()),
            publisher,
            store,
            metrics,
            application: application.into(),
        }
    }

    /// Restore the registry from the last durable snapshot.
    /// Returns the number of records restored.
    pub fn load_persisted(&self) -> Result<usize, AlertError> {
        let records = self.store.load()?;
        let count = records.len();
        self.lock_registry().hydrate(records);
        Ok(count)
    }

    /// Ordered copy of all currently active records.
    pub fn snapshot(&self) -> Vec<AlertRecord> {
        self.lock_registry().snapshot()
    }

    /// Apply one inbound event: mutate the registry first, then publish
    /// the record(s) the mutation produced, never the caller's raw input,
    /// since the registry may have synthesized or merged state.
    pub async fn handle_event(&self, event: AlertEvent) -> Result<(), AlertError> {
        self.metrics.record_event(event.kind());

        match event {
            AlertEvent::Raise(e) => {
                let record = self.lock_registry().raise(&e);
                tracing::info!(
                    alert_id = %record.id,
                    raised_by = %record.raised_by,
                    location = %record.location,
                    "alert raised"
                );
                self.publish_record(&record).await
            }
            AlertEvent::Acknowledge(e) => {
                let record = self.lock_registry().acknowledge(&e);
                tracing::info!(
                    alert_id = %record.id,
                    acknowledged_by = record.acknowledged_by.as_deref().unwrap_or(""),
                    tier = %record.sla_tier,
                    "alert acknowledged"
                );
                self.publish_record(&record).await
            }
            AlertEvent::Resolve(e) => {
                let record = self.lock_registry().resolve(&e);
                tracing::info!(
                    alert_id = %record.id,
                    resolved_by = record.resolved_by.as_deref().unwrap_or(""),
                    "alert resolved"
                );
                self.publish_record(&record).await
            }
            AlertEvent::ClearBySla { min_tier } => {
                let removed = self.lock_registry().remove_by_min_tier(min_tier);
                tracing::info!(
                    min_tier = %min_tier,
                    removed = removed.len(),
                    "bulk SLA clearance"
                );
                for record in &removed {
                    if let Err(e) = self.publish_record(record).await {
                        tracing::warn!(
                            alert_id = %record.id,
                            error = %e,
                            "final clearance publish failed"
                        );
                    }
                }
                Ok(())
            }
        }
    }

    /// One full reconciliation pass: prune terminal records, escalate the
    /// rest, republish every active record, emit the liveness marker, and
    /// persist if anything changed. All failures are contained; periodic
    /// republication exists precisely to heal earlier transient ones.
    pub async fn reconcile_cycle(&self, now: DateTime<Utc>) {
        let snapshot = {
            let mut registry = self.lock_registry();
            registry.prune();
            registry.escalate_all(now);
            registry.snapshot()
        };
        self.metrics.set_active_alerts(snapshot.len() as u64);

        for record in &snapshot {
            if let Err(e) = self.publish_record(record).await {
                tracing::warn!(alert_id = %record.id, error = %e, "periodic republish failed");
            }
        }

        if let Err(e) = self.publisher.publish_liveness().await {
            tracing::warn!(error = %e, "liveness publish failed");
        }

        self.persist_if_dirty();
        self.metrics.record_cycle();
    }

    /// Write the current active set to the store if it has diverged from
    /// the last saved snapshot. The dirty flag is cleared before the write
    /// so concurrent mutations re-flag themselves; a failed write re-marks
    /// it, keeping the in-memory registry authoritative until the next
    /// successful save.
    pub fn persist_if_dirty(&self) {
        let pending = {
            let mut registry = self.lock_registry();
            if !registry.is_dirty() {
                return;
            }
            registry.mark_clean();
            registry.snapshot()
        };

        match self.store.save(&pending) {
            Ok(()) => {
                self.metrics.record_persistence("success");
                tracing::debug!(records = pending.len(), "registry snapshot persisted");
            }
            Err(e) => {
                self.metrics.record_persistence("failure");
                self.lock_registry().mark_dirty();
                tracing::warn!(error = %e, "registry snapshot save failed");
            }
        }
    }

    async fn publish_record(&self, record: &AlertRecord) -> Result<(), AlertError> {
        self.publisher.reconnect_if_needed().await?;

        let payload = serde_json::to_vec(record)
            .map_err(|e| AlertError::PublishFailed(format!("serialize: {e}")))?;
        let topic = record.topic(&self.application);

        let result = self.publisher.publish(&topic, &payload).await;
        match &result {
            Ok(()) => self.metrics.record_publish("success"),
            Err(_) => self.metrics.record_publish("failure"),
        }
        result
    }

    /// A poisoned lock means a panic mid-mutation; the registry map itself
    /// is still structurally sound, so recover the guard and continue.
    fn lock_registry(&self) -> MutexGuard<'_, AlertRegistry> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::alert::event::LifecycleEvent;
    use domain::alert::sla::SlaTier;
    use ports::test_utils::{InMemoryStateStore, NoopMetrics, RecordingPublisher};

    fn make_event(id: &str, actor: &str, tier: SlaTier) -> LifecycleEvent {
        LifecycleEvent {
            id: id.to_string(),
            name: "Jam".to_string(),
            category: "Mechanical".to_string(),
            location: "L1".to_string(),
            actor: actor.to_string(),
            timestamp: Some(Utc::now()),
            sla_tier: tier,
        }
    }

    struct Harness {
        service: Arc<AlertAppService>,
        publisher: Arc<RecordingPublisher>,
        store: Arc<InMemoryStateStore>,
    }

    fn make_harness() -> Harness {
        let publisher = Arc::new(RecordingPublisher::new());
        let store = Arc::new(InMemoryStateStore::new());
        let service = Arc::new(AlertAppService::new(
            publisher.clone(),
            store.clone(),
            Arc::new(NoopMetrics),
            "factory",
        ));
        Harness {
            service,
            publisher,
            store,
        }
    }

    #[tokio::test]
    async fn raise_publishes_the_stored_record() {
        let h = make_harness();
        h.service
            .handle_event(AlertEvent::Raise(make_event("A1", "alice", SlaTier::Normal)))
            .await
            .unwrap();

        let published = h.publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "factory/alerts/L1/Jam");

        let record: AlertRecord = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(record.id, "A1");
        assert!(record.active);

        // The reconnect contract is honored before every publish.
        assert_eq!(h.publisher.reconnect_count(), 1);
    }

    #[tokio::test]
    async fn acknowledge_publishes_merged_state_not_caller_input() {
        let h = make_harness();
        h.service
            .handle_event(AlertEvent::Raise(make_event(
                "A1",
                "alice",
                SlaTier::Critical,
            )))
            .await
            .unwrap();

        // The acknowledge arrives with a lower tier; the published payload
        // must carry the merged (clamped-up) record.
        h.service
            .handle_event(AlertEvent::Acknowledge(make_event(
                "A1",
                "bob",
                SlaTier::Normal,
            )))
            .await
            .unwrap();

        let published = h.publisher.published();
        let record: AlertRecord = serde_json::from_slice(&published[1].1).unwrap();
        assert_eq!(record.sla_tier, SlaTier::Critical);
        assert_eq!(record.acknowledged_by.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn resolved_record_is_published_once_then_never_again() {
        let h = make_harness();
        h.service
            .handle_event(AlertEvent::Raise(make_event("A1", "alice", SlaTier::Normal)))
            .await
            .unwrap();
        h.service
            .handle_event(AlertEvent::Resolve(make_event(
                "A1",
                "carol",
                SlaTier::Normal,
            )))
            .await
            .unwrap();
        assert_eq!(h.publisher.published().len(), 2);

        // Two reconcile cycles: prune runs before the publish pass, so the
        // terminal record never reappears on the bus.
        h.service.reconcile_cycle(Utc::now()).await;
        h.service.reconcile_cycle(Utc::now()).await;
        assert_eq!(h.publisher.published().len(), 2);
        assert!(h.service.snapshot().is_empty());
    }

    #[tokio::test]
    async fn reconcile_republishes_active_records_and_liveness() {
        let h = make_harness();
        h.service
            .handle_event(AlertEvent::Raise(make_event("A1", "alice", SlaTier::Normal)))
            .await
            .unwrap();
        h.service
            .handle_event(AlertEvent::Raise(make_event("B2", "bob", SlaTier::Normal)))
            .await
            .unwrap();

        h.service.reconcile_cycle(Utc::now()).await;

        // 2 event publishes + 2 periodic republishes.
        assert_eq!(h.publisher.published().len(), 4);
        assert_eq!(h.publisher.liveness_count(), 1);
    }

    #[tokio::test]
    async fn reconcile_escalates_before_publishing() {
        let h = make_harness();
        let mut event = make_event("A1", "alice", SlaTier::Normal);
        event.timestamp = Some(Utc::now() - Duration::minutes(65));
        h.service
            .handle_event(AlertEvent::Raise(event))
            .await
            .unwrap();

        h.service.reconcile_cycle(Utc::now()).await;

        let published = h.publisher.published();
        let record: AlertRecord = serde_json::from_slice(&published.last().unwrap().1).unwrap();
        assert_eq!(record.sla_tier, SlaTier::Critical);
    }

    #[tokio::test]
    async fn publish_failure_does_not_abort_the_cycle() {
        let h = make_harness();
        h.service
            .handle_event(AlertEvent::Raise(make_event("A1", "alice", SlaTier::Normal)))
            .await
            .unwrap();

        h.publisher.set_fail_publish(true);
        h.service.reconcile_cycle(Utc::now()).await;

        // The cycle still ran to completion: persistence happened even
        // though every publish failed.
        assert_eq!(h.store.save_count(), 1);
        assert_eq!(h.store.records().len(), 1);
    }

    #[tokio::test]
    async fn persistence_only_runs_when_dirty() {
        let h = make_harness();
        h.service
            .handle_event(AlertEvent::Raise(make_event("A1", "alice", SlaTier::Normal)))
            .await
            .unwrap();

        h.service.reconcile_cycle(Utc::now()).await;
        assert_eq!(h.store.save_count(), 1);

        // Nothing changed since the save: idle cycles skip the write.
        h.service.reconcile_cycle(Utc::now()).await;
        h.service.reconcile_cycle(Utc::now()).await;
        assert_eq!(h.store.save_count(), 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_registry_dirty_for_retry() {
        let h = make_harness();
        h.service
            .handle_event(AlertEvent::Raise(make_event("A1", "alice", SlaTier::Normal)))
            .await
            .unwrap();

        h.store.set_fail_save(true);
        h.service.reconcile_cycle(Utc::now()).await;
        assert_eq!(h.store.save_count(), 0);

        h.store.set_fail_save(false);
        h.service.reconcile_cycle(Utc::now()).await;
        assert_eq!(h.store.save_count(), 1);
        assert_eq!(h.store.records().len(), 1);
    }

    #[tokio::test]
    async fn save_load_round_trip_reproduces_the_registry() {
        let h = make_harness();
        h.service
            .handle_event(AlertEvent::Raise(make_event("A1", "alice", SlaTier::Warning)))
            .await
            .unwrap();
        h.service
            .handle_event(AlertEvent::Raise(make_event("B2", "bob", SlaTier::Normal)))
            .await
            .unwrap();
        h.service.reconcile_cycle(Utc::now()).await;
        let saved = h.service.snapshot();

        // A fresh service over the same store sees the identical set.
        let restored = AlertAppService::new(
            Arc::new(RecordingPublisher::new()),
            h.store.clone(),
            Arc::new(NoopMetrics),
            "factory",
        );
        assert_eq!(restored.load_persisted().unwrap(), 2);
        assert_eq!(restored.snapshot(), saved);
    }

    #[tokio::test]
    async fn empty_registry_round_trip() {
        let h = make_harness();
        let restored = AlertAppService::new(
            Arc::new(RecordingPublisher::new()),
            h.store.clone(),
            Arc::new(NoopMetrics),
            "factory",
        );
        assert_eq!(restored.load_persisted().unwrap(), 0);
        assert!(restored.snapshot().is_empty());
    }

    #[tokio::test]
    async fn clear_by_sla_publishes_final_notification_per_removed_record() {
        let h = make_harness();
        h.service
            .handle_event(AlertEvent::Raise(make_event("LOW", "a", SlaTier::Normal)))
            .await
            .unwrap();
        h.service
            .handle_event(AlertEvent::Raise(make_event("HI", "b", SlaTier::Critical)))
            .await
            .unwrap();

        h.service
            .handle_event(AlertEvent::ClearBySla {
                min_tier: SlaTier::Critical,
            })
            .await
            .unwrap();

        let published = h.publisher.published();
        assert_eq!(published.len(), 3);
        let record: AlertRecord = serde_json::from_slice(&published[2].1).unwrap();
        assert_eq!(record.id, "HI");
        assert!(!record.active, "clearance notification announces inactive");

        let remaining = h.service.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "LOW");
    }

    #[tokio::test]
    async fn concurrent_acknowledge_and_reconcile_lose_no_update() {
        let h = make_harness();
        let mut event = make_event("A1", "alice", SlaTier::Normal);
        event.timestamp = Some(Utc::now() - Duration::minutes(65));
        h.service
            .handle_event(AlertEvent::Raise(event))
            .await
            .unwrap();

        let ack_service = h.service.clone();
        let ack = tokio::spawn(async move {
            ack_service
                .handle_event(AlertEvent::Acknowledge(make_event(
                    "A1",
                    "bob",
                    SlaTier::Warning,
                )))
                .await
        });
        let cycle_service = h.service.clone();
        let cycle = tokio::spawn(async move {
            cycle_service.reconcile_cycle(Utc::now()).await;
        });

        ack.await.unwrap().unwrap();
        cycle.await.unwrap();

        // Whichever order the two paths won the lock in, the final state
        // carries both the acknowledger fields and the escalated tier.
        let snapshot = h.service.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].acknowledged_by.as_deref(), Some("bob"));
        assert_eq!(snapshot[0].sla_tier, SlaTier::Critical);
    }
}
