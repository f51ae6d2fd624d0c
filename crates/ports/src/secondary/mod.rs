pub mod message_publisher;
pub mod metrics_port;
pub mod state_store;
