use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::{Broker, InboundEvent};

/// In-process reference [`Broker`]: publishing to a stream fans out to every
/// subscriber currently registered on it. Used by tests; not a real wire
/// protocol.
#[derive(Default)]
pub struct MemoryBroker {
	subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<InboundEvent>>>>,
}

impl MemoryBroker {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl Broker for MemoryBroker {
	async fn subscribe(&self, stream: &str) -> anyhow::Result<mpsc::Receiver<InboundEvent>> {
		let (tx, rx) = mpsc::channel(1024);
		self
			.subscribers
			.lock()
			.await
			.entry(stream.to_string())
			.or_default()
			.push(tx);
		Ok(rx)
	}

	async fn publish(&self, stream: &str, payload: serde_json::Value) -> anyhow::Result<()> {
		let subscribers = self.subscribers.lock().await;
		if let Some(senders) = subscribers.get(stream) {
			let event = InboundEvent {
				stream: stream.to_string(),
				payload,
			};
			for sender in senders {
				// Best effort: a full or closed subscriber should not block
				// publication to the others.
				let _ = sender.try_send(event.clone());
			}
		}
		Ok(())
	}
}
