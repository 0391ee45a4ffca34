//! The broker collaborator contract (design doc §6). Event payloads are
//! opaque to the core; only a sensor's `correlatable_keys` handler
//! interprets them.

pub mod memory;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// An inbound event on a named stream.
#[derive(Debug, Clone)]
pub struct InboundEvent {
	pub stream: String,
	pub payload: serde_json::Value,
}

#[async_trait]
pub trait Broker: Send + Sync {
	/// Subscribes to `stream`, returning a receiver of events as they arrive.
	async fn subscribe(&self, stream: &str) -> anyhow::Result<mpsc::Receiver<InboundEvent>>;

	/// Publishes `payload` to `stream`.
	async fn publish(&self, stream: &str, payload: serde_json::Value) -> anyhow::Result<()>;
}
