use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AlertError;

/// Width of one escalation window: an unresolved alert climbs one tier
/// per elapsed window, saturating at [`SlaTier::Critical`].
pub const ESCALATION_WINDOW_MINUTES: i64 = 30;

/// Escalation level of an alert.
///
/// Serialized as the bare integer (0/1/2) so bus payloads and the
/// persisted snapshot stay wire-compatible with downstream displays.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum SlaTier {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl SlaTier {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Warning => 1,
            Self::Critical => 2,
        }
    }
}

impl From<SlaTier> for u8 {
    fn from(tier: SlaTier) -> Self {
        tier.as_u8()
    }
}

impl TryFrom<u8> for SlaTier {
    type Error = AlertError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Warning),
            2 => Ok(Self::Critical),
            other => Err(AlertError::InvalidTier(other)),
        }
    }
}

impl std::fmt::Display for SlaTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl std::str::FromStr for SlaTier {
    type Err = AlertError;

    /// Parse the ASCII decimal form used on the `clearSla` control channel.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| AlertError::MalformedEvent(format!("unparseable SLA tier '{s}'")))?;
        Self::try_from(value)
    }
}

/// Tier implied by elapsed unresolved time.
///
/// Returns `None` for a record with no known raise time; such records
/// are exempt from automatic escalation and keep their stored tier.
/// Negative elapsed time (clock skew) computes `Normal`; callers merge
/// the result upward, so a skewed clock can never lower a tier.
pub fn compute_tier(raised_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<SlaTier> {
    let raised_at = raised_at?;
    let elapsed_minutes = (now - raised_at).num_minutes().max(0);
    Some(match elapsed_minutes / ESCALATION_WINDOW_MINUTES {
        0 => SlaTier::Normal,
        1 => SlaTier::Warning,
        _ => SlaTier::Critical,
    })
}
