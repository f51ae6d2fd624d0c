use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use ports::secondary::metrics_port::{CycleMetrics, EventMetrics, PublishMetrics};

// ── Label types ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct KindLabels {
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReasonLabels {
    pub reason: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResultLabels {
    pub result: String,
}

// ── Agent metrics ───────────────────────────────────────────────────

/// Prometheus-backed implementation of the metrics port.
pub struct AgentMetrics {
    registry: Registry,
    events: Family<KindLabels, Counter>,
    events_dropped: Family<ReasonLabels, Counter>,
    publishes: Family<ResultLabels, Counter>,
    persistence: Family<ResultLabels, Counter>,
    cycles: Counter,
    active_alerts: Gauge,
}

impl AgentMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("andond");

        let events = Family::<KindLabels, Counter>::default();
        registry.register(
            "events",
            "Inbound alert events dispatched, by kind",
            events.clone(),
        );

        let events_dropped = Family::<ReasonLabels, Counter>::default();
        registry.register(
            "events_dropped",
            "Inbound events dropped before dispatch, by reason",
            events_dropped.clone(),
        );

        let publishes = Family::<ResultLabels, Counter>::default();
        registry.register(
            "publishes",
            "Bus publish attempts, by result",
            publishes.clone(),
        );

        let persistence = Family::<ResultLabels, Counter>::default();
        registry.register(
            "persistence",
            "Registry snapshot save attempts, by result",
            persistence.clone(),
        );

        let cycles = Counter::default();
        registry.register(
            "reconcile_cycles",
            "Completed reconciliation cycles",
            cycles.clone(),
        );

        let active_alerts = Gauge::default();
        registry.register(
            "active_alerts",
            "Currently active alerts in the registry",
            active_alerts.clone(),
        );

        Self {
            registry,
            events,
            events_dropped,
            publishes,
            persistence,
            cycles,
            active_alerts,
        }
    }

    /// Render the registry in OpenMetrics text exposition format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            buffer.clear();
        }
        buffer
    }
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EventMetrics for AgentMetrics {
    fn record_event(&self, kind: &str) {
        self.events
            .get_or_create(&KindLabels {
                kind: kind.to_string(),
            })
            .inc();
    }

    fn record_event_dropped(&self, reason: &str) {
        self.events_dropped
            .get_or_create(&ReasonLabels {
                reason: reason.to_string(),
            })
            .inc();
    }
}

impl PublishMetrics for AgentMetrics {
    fn record_publish(&self, result: &str) {
        self.publishes
            .get_or_create(&ResultLabels {
                result: result.to_string(),
            })
            .inc();
    }
}

impl CycleMetrics for AgentMetrics {
    fn record_cycle(&self) {
        self.cycles.inc();
    }

    fn set_active_alerts(&self, count: u64) {
        self.active_alerts.set(count as i64);
    }

    fn record_persistence(&self, result: &str) {
        self.persistence
            .get_or_create(&ResultLabels {
                result: result.to_string(),
            })
            .inc();
    }
}
