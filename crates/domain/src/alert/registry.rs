use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::entity::AlertRecord;
use super::event::LifecycleEvent;
use super::sla::SlaTier;

/// In-memory registry of all live alerts, keyed by alert id.
///
/// Pure state machine: no locking, no I/O. The application layer owns the
/// only instance behind a mutex and never exposes it to callers directly.
/// The dirty flag tracks divergence from the last persisted snapshot.
#[derive(Debug, Default)]
pub struct AlertRegistry {
    records: HashMap<String, AlertRecord>,
    dirty: bool,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registry contents with a persisted snapshot.
    /// Loaded state is by definition in sync with the store.
    pub fn hydrate(&mut self, records: Vec<AlertRecord>) {
        self.records = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        self.dirty = false;
    }

    /// Insert or overwrite the record for the event's id (last write wins).
    /// Returns the stored record for publication.
    pub fn raise(&mut self, event: &LifecycleEvent) -> AlertRecord {
        let record = AlertRecord::from_event(event);
        self.records.insert(record.id.clone(), record.clone());
        self.dirty = true;
        record
    }

    /// Apply an acknowledge to the stored record, or synthesize one from
    /// the event's fields when the raise was never seen (redelivery or
    /// out-of-order arrival). Returns the resulting record.
    pub fn acknowledge(&mut self, event: &LifecycleEvent) -> AlertRecord {
        let record = self
            .records
            .entry(event.id.clone())
            .or_insert_with(|| AlertRecord::from_event(event));
        record.acknowledge(&event.actor, event.timestamp, event.sla_tier);
        self.dirty = true;
        record.clone()
    }

    /// Same lookup-or-synthesize rule as [`Self::acknowledge`]; deactivates
    /// the record. Returns the resulting record.
    pub fn resolve(&mut self, event: &LifecycleEvent) -> AlertRecord {
        let record = self
            .records
            .entry(event.id.clone())
            .or_insert_with(|| AlertRecord::from_event(event));
        record.resolve(&event.actor, event.timestamp, event.sla_tier);
        self.dirty = true;
        record.clone()
    }

    /// Drop every terminal record. Returns whether anything was removed.
    pub fn prune(&mut self) -> bool {
        let before = self.records.len();
        self.records.retain(|_, record| record.active);
        let removed = self.records.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// Recompute every active record's tier from elapsed time, raising but
    /// never lowering. Returns the number of records escalated.
    pub fn escalate_all(&mut self, now: DateTime<Utc>) -> usize {
        let mut escalated = 0;
        for record in self.records.values_mut().filter(|r| r.active) {
            if record.escalate(now) {
                escalated += 1;
            }
        }
        if escalated > 0 {
            self.dirty = true;
        }
        escalated
    }

    /// Force-deactivate and remove every record at or above `min_tier`,
    /// returning them (ordered by id) so the caller can announce each
    /// removal exactly once.
    pub fn remove_by_min_tier(&mut self, min_tier: SlaTier) -> Vec<AlertRecord> {
        let ids: Vec<String> = self
            .records
            .values()
            .filter(|r| r.sla_tier >= min_tier)
            .map(|r| r.id.clone())
            .collect();

        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(mut record) = self.records.remove(&id) {
                record.force_deactivate();
                removed.push(record);
            }
        }
        if !removed.is_empty() {
            self.dirty = true;
        }
        removed.sort_by(|a, b| a.id.cmp(&b.id));
        removed
    }

    /// Ordered copy of all currently active records, safe to iterate
    /// without holding any lock.
    pub fn snapshot(&self) -> Vec<AlertRecord> {
        let mut records: Vec<AlertRecord> = self
            .records
            .values()
            .filter(|r| r.active)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
