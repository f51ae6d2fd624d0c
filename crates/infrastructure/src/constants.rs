use std::time::Duration;

// ── Paths ──────────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "/etc/andond/config.yaml";
pub const DEFAULT_SPOOL_DIR: &str = "/var/spool/andond";
pub const DEFAULT_STATE_PATH: &str = "/var/lib/andond/alerts.json";

// ── Network defaults ───────────────────────────────────────────────

pub const DEFAULT_METRICS_PORT: u16 = 9464;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

// ── Channel capacities ─────────────────────────────────────────────

pub const EVENT_CHANNEL_CAPACITY: usize = 1_000;

// ── Cadences and timeouts ──────────────────────────────────────────

/// Pause between reconciliation cycles, measured from the end of the
/// previous cycle.
pub const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 2_000;

/// Pause between spool directory scans.
pub const DEFAULT_SPOOL_POLL_SECS: u64 = 5;

pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ── Control channel ────────────────────────────────────────────────

/// Topic suffix for the bulk-clearance control channel; the payload is
/// the ASCII decimal minimum tier.
pub const CLEAR_SLA_TOPIC_SUFFIX: &str = "clearSla";
