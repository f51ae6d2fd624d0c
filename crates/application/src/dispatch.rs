use std::sync::Arc;

use domain::alert::error::AlertError;
use domain::alert::event::AlertEvent;
use domain::alert::sla::SlaTier;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::alert_service::AlertAppService;

/// Single consumer of the bounded inbound event channel.
///
/// The event source and the `clearSla` control subscription both feed the
/// same channel, so every registry mutation is applied strictly in
/// arrival order and the source's callback context never re-enters the
/// engine. Per-event failures are logged and never stop the loop.
pub async fn run_dispatch_loop(
    service: Arc<AlertAppService>,
    mut events: mpsc::Receiver<AlertEvent>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                // All senders dropped: nothing more will arrive.
                None => break,
            },
        };

        let kind = event.kind();
        let alert_id = event.alert_id().map(str::to_string);
        if let Err(e) = service.handle_event(event).await {
            tracing::warn!(
                kind,
                alert_id = alert_id.as_deref().unwrap_or(""),
                error = %e,
                "event handling failed"
            );
        }
    }
    tracing::debug!("event dispatch loop stopped");
}

/// Decode a `clearSla` control payload (ASCII decimal tier) into the
/// dispatcher event it triggers.
pub fn clear_event_from_payload(payload: &[u8]) -> Result<AlertEvent, AlertError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| AlertError::MalformedEvent("clearSla payload is not UTF-8".to_string()))?;
    let min_tier: SlaTier = text.parse()?;
    Ok(AlertEvent::ClearBySla { min_tier })
}
