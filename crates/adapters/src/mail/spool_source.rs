use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use domain::alert::error::AlertError;
use domain::alert::event::AlertEvent;
use ports::secondary::metrics_port::{EventMetrics, MetricsPort};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::parser::parse_alert_body;

/// Alert event source reading plain-text message bodies from a spool
/// ("drop folder") directory.
///
/// Each file is one message. Files are processed in name order and
/// deleted once handled, also when malformed, so a poison message can
/// never wedge the spool. Parsed events go into the bounded dispatcher
/// channel; if the dispatcher has gone away the source stops.
pub struct SpoolEventSource {
    dir: PathBuf,
    poll_interval: Duration,
    metrics: Arc<dyn MetricsPort>,
}

impl SpoolEventSource {
    pub fn new(dir: impl Into<PathBuf>, poll_interval: Duration, metrics: Arc<dyn MetricsPort>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval,
            metrics,
        }
    }

    /// Drain whatever is already spooled, then keep polling for new
    /// messages until shutdown.
    pub async fn run(self, events: mpsc::Sender<AlertEvent>, shutdown: CancellationToken) {
        tracing::info!(dir = %self.dir.display(), "spool event source started");
        loop {
            match self.drain_once(&events).await {
                Ok(0) => {}
                Ok(forwarded) => tracing::debug!(forwarded, "spool drained"),
                Err(e) => tracing::warn!(error = %e, "spool scan failed"),
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        tracing::debug!("spool event source stopped");
    }

    /// Process every message file currently in the spool directory.
    /// Returns the number of events forwarded to the dispatcher.
    pub async fn drain_once(
        &self,
        events: &mpsc::Sender<AlertEvent>,
    ) -> Result<usize, AlertError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .map_err(|e| AlertError::LoadFailed(format!("read spool {}: {e}", self.dir.display())))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut forwarded = 0;
        for path in paths {
            match self.read_message(&path) {
                Ok(event) => {
                    if events.send(event).await.is_err() {
                        // Dispatcher gone; leave the file for a restart.
                        return Ok(forwarded);
                    }
                    forwarded += 1;
                }
                Err(e) => {
                    self.metrics.record_event_dropped("parse_failure");
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "dropping malformed alert message"
                    );
                }
            }
            consume(&path);
        }
        Ok(forwarded)
    }

    fn read_message(&self, path: &Path) -> Result<AlertEvent, AlertError> {
        let body = std::fs::read_to_string(path)
            .map_err(|e| AlertError::LoadFailed(format!("read {}: {e}", path.display())))?;
        parse_alert_body(&body)
    }
}

/// Delete a handled message file; failure only means it will be seen
/// again on the next scan.
fn consume(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to delete handled message");
    }
}
