use domain::alert::entity::AlertRecord;
use domain::alert::error::AlertError;

/// Secondary port for crash-recovery persistence of the alert registry.
///
/// The store holds exactly one snapshot: the full current active-record
/// set, replaced wholesale on every save. Implementations may use a JSON
/// file or in-memory storage (tests).
pub trait StateStore: Send + Sync {
    /// Read the last durable snapshot. A missing snapshot is not an
    /// error: implementations return an empty set for a fresh start.
    fn load(&self) -> Result<Vec<AlertRecord>, AlertError>;

    /// Atomically replace the durable snapshot with `records`.
    fn save(&self, records: &[AlertRecord]) -> Result<(), AlertError>;
}
