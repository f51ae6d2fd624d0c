use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use domain::alert::error::AlertError;

/// Callback invoked with `(topic, payload)` for each message arriving on a
/// subscribed control topic.
pub type ControlHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Secondary port for the outbound message bus.
///
/// Uses `Pin<Box<dyn Future>>` return types (instead of RPITIT) so the
/// trait is dyn-compatible and can be used as `Arc<dyn MessagePublisher>`.
///
/// Contract the engine depends on:
/// - `connect` establishes the session and registers the retained
///   last-will payload so the bus announces an ungraceful disconnect;
/// - `reconnect_if_needed` is idempotent and safe to call before every
///   publish; implementations serialize it internally so concurrent
///   callers wait on a single attempt rather than racing reconnects;
/// - `publish_liveness` emits the "process is alive" marker on the will
///   topic, once per reconciliation cycle.
pub trait MessagePublisher: Send + Sync {
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + '_>>;

    fn reconnect_if_needed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + '_>>;

    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>>;

    fn publish_liveness(&self) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + '_>>;

    /// Subscribe to the control topic ending in `topic_suffix`; the full
    /// topic is `{application}/{client_id}/{topic_suffix}`.
    fn subscribe<'a>(
        &'a self,
        topic_suffix: &'a str,
        handler: ControlHandler,
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>>;
}
