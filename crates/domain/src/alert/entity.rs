use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::LifecycleEvent;
use super::sla::{self, SlaTier};

/// One tracked andon alert, from raise to resolution.
///
/// Serialized as JSON both for bus publication and for the persisted
/// registry snapshot, so field names are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub location: String,
    pub raised_by: String,
    /// `None` when the source could not extract a timestamp; such records
    /// are exempt from automatic escalation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raised_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub sla_tier: SlaTier,
    pub active: bool,
}

impl AlertRecord {
    /// Create a fresh active record from a lifecycle event's fields.
    pub fn from_event(event: &LifecycleEvent) -> Self {
        Self {
            id: event.id.clone(),
            name: event.name.clone(),
            category: event.category.clone(),
            location: event.location.clone(),
            raised_by: event.actor.clone(),
            raised_at: event.timestamp,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            sla_tier: event.sla_tier,
            active: true,
        }
    }

    /// Record the acknowledger. Acknowledger and time are set once; the
    /// tier merges upward. A terminal record stays terminal.
    pub fn acknowledge(&mut self, by: &str, at: Option<DateTime<Utc>>, tier: SlaTier) {
        if self.acknowledged_by.is_none() {
            self.acknowledged_by = Some(by.to_string());
            self.acknowledged_at = at;
        }
        self.raise_tier(tier);
    }

    /// Record the resolver and deactivate. Resolver and time are set once;
    /// the tier merges upward.
    pub fn resolve(&mut self, by: &str, at: Option<DateTime<Utc>>, tier: SlaTier) {
        if self.resolved_by.is_none() {
            self.resolved_by = Some(by.to_string());
            self.resolved_at = at;
        }
        self.raise_tier(tier);
        self.active = false;
    }

    /// Raise the tier if `tier` exceeds the stored one; never lowers.
    /// Returns whether the tier changed.
    pub fn raise_tier(&mut self, tier: SlaTier) -> bool {
        if tier > self.sla_tier {
            self.sla_tier = tier;
            true
        } else {
            false
        }
    }

    /// Recompute the tier from elapsed time and merge it upward.
    /// Returns whether the tier changed.
    pub fn escalate(&mut self, now: DateTime<Utc>) -> bool {
        match sla::compute_tier(self.raised_at, now) {
            Some(tier) => self.raise_tier(tier),
            None => false,
        }
    }

    /// Mark inactive without a resolve event (administrative clearance).
    pub fn force_deactivate(&mut self) {
        self.active = false;
    }

    /// Bus topic this record is published under.
    pub fn topic(&self, application: &str) -> String {
        format!("{application}/alerts/{}/{}", self.location, self.name)
    }
}
