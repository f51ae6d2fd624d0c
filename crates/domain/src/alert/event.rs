use chrono::{DateTime, Utc};

use super::sla::SlaTier;

/// Field set shared by the three lifecycle transitions, extracted by the
/// event source from whatever transport it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub id: String,
    pub name: String,
    pub category: String,
    pub location: String,
    /// Who performed this transition (raiser, acknowledger or resolver).
    pub actor: String,
    /// When the transition happened at the source; `None` if the source
    /// could not extract a timestamp.
    pub timestamp: Option<DateTime<Utc>>,
    pub sla_tier: SlaTier,
}

/// One inbound unit of work for the event dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    Raise(LifecycleEvent),
    Acknowledge(LifecycleEvent),
    Resolve(LifecycleEvent),
    /// Administrative bulk clearance of every alert at or above the tier.
    ClearBySla { min_tier: SlaTier },
}

impl AlertEvent {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Raise(_) => "raise",
            Self::Acknowledge(_) => "acknowledge",
            Self::Resolve(_) => "resolve",
            Self::ClearBySla { .. } => "clear_by_sla",
        }
    }

    /// The alert id this event targets, where one exists.
    pub fn alert_id(&self) -> Option<&str> {
        match self {
            Self::Raise(e) | Self::Acknowledge(e) | Self::Resolve(e) => Some(&e.id),
            Self::ClearBySla { .. } => None,
        }
    }
}
