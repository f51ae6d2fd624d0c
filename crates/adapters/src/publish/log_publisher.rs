use std::future::Future;
use std::pin::Pin;

use domain::alert::error::AlertError;
use ports::secondary::message_publisher::{ControlHandler, MessagePublisher};

/// Publisher that writes every message to the structured log.
///
/// Default transport when no external bus is wired in: the engine's
/// publish/reconnect/liveness contract is exercised end to end and each
/// payload is observable in the log stream. Control subscriptions are
/// accepted but never delivered to, since logs have no inbound path.
pub struct LogPublisher {
    application: String,
    client_id: String,
}

impl LogPublisher {
    pub fn new(application: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            client_id: client_id.into(),
        }
    }

    /// Topic carrying the liveness marker, registered as the last-will
    /// topic on connect.
    fn will_topic(&self) -> String {
        format!("{}/will_message/{}", self.application, self.client_id)
    }
}

impl MessagePublisher for LogPublisher {
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + '_>> {
        Box::pin(async move {
            tracing::info!(
                client_id = %self.client_id,
                will_topic = %self.will_topic(),
                "log transport session opened"
            );
            Ok(())
        })
    }

    fn reconnect_if_needed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                topic,
                payload = %String::from_utf8_lossy(payload),
                "message published"
            );
            Ok(())
        })
    }

    fn publish_liveness(&self) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + '_>> {
        Box::pin(async move {
            tracing::debug!(topic = %self.will_topic(), "liveness marker published");
            Ok(())
        })
    }

    fn subscribe<'a>(
        &'a self,
        topic_suffix: &'a str,
        _handler: ControlHandler,
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>> {
        Box::pin(async move {
            let topic = format!("{}/{}/{topic_suffix}", self.application, self.client_id);
            tracing::info!(
                %topic,
                "control subscription registered (log transport delivers nothing inbound)"
            );
            Ok(())
        })
    }
}
