//! Shared test doubles and DAG builders for the integration suite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dagrunner::broker::memory::MemoryBroker;
use dagrunner::config::EngineConfig;
use dagrunner::engine::Engine;
use dagrunner::handlers::Handlers;
use dagrunner::id::Id;
use dagrunner::instance::RuntimeParameters;
use dagrunner::store::memory::MemoryStore;

type ExecuteFn = Box<dyn Fn() -> anyhow::Result<serde_json::Value> + Send + Sync>;
type EvaluateFn = Box<dyn Fn(&[Id]) -> Option<Id> + Send + Sync>;
type IntervalFn = Box<dyn Fn(i64) -> bool + Send + Sync>;

/// A scriptable [`Handlers`] test double. Every lookup by an unregistered
/// name falls back to a default (`execute` succeeds with `null`, `evaluate`
/// picks the first candidate, `interval_execute` finishes immediately).
#[derive(Default)]
pub struct TestHandlers {
	execute_fns: Mutex<HashMap<String, ExecuteFn>>,
	evaluate_fns: Mutex<HashMap<String, EvaluateFn>>,
	interval_fns: Mutex<HashMap<String, IntervalFn>>,
}

impl TestHandlers {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_execute(&self, name: &str, f: impl Fn() -> anyhow::Result<serde_json::Value> + Send + Sync + 'static) {
		self.execute_fns.lock().unwrap().insert(name.to_string(), Box::new(f));
	}

	pub fn on_evaluate(&self, name: &str, f: impl Fn(&[Id]) -> Option<Id> + Send + Sync + 'static) {
		self.evaluate_fns.lock().unwrap().insert(name.to_string(), Box::new(f));
	}

	pub fn on_interval(&self, name: &str, f: impl Fn(i64) -> bool + Send + Sync + 'static) {
		self.interval_fns.lock().unwrap().insert(name.to_string(), Box::new(f));
	}
}

#[async_trait]
impl Handlers for TestHandlers {
	async fn execute(&self, handler: &str, _params: &RuntimeParameters) -> anyhow::Result<serde_json::Value> {
		match self.execute_fns.lock().unwrap().get(handler) {
			Some(f) => f(),
			None => Ok(serde_json::Value::Null),
		}
	}

	async fn evaluate(&self, handler: &str, _params: &RuntimeParameters, candidates: &[Id]) -> Option<Id> {
		match self.evaluate_fns.lock().unwrap().get(handler) {
			Some(f) => f(candidates),
			None => candidates.first().copied(),
		}
	}

	async fn interval_execute(&self, handler: &str, _params: &RuntimeParameters) -> bool {
		let now = dagrunner::utils::time::now();
		match self.interval_fns.lock().unwrap().get(handler) {
			Some(f) => f(now),
			None => true,
		}
	}

	async fn on_message(&self, _stream: &str, params: &mut RuntimeParameters, event: &serde_json::Value) -> bool {
		if let Some(attr) = event.get("key").and_then(|v| v.as_str()) {
			if let Some(value) = event.get("value") {
				params.insert(attr.to_string(), value.clone());
			}
		}
		event.get("satisfied").and_then(|v| v.as_bool()).unwrap_or(true)
	}

	fn correlatable_keys_from_payload(&self, _stream: &str, payload: &serde_json::Value) -> Vec<(String, String)> {
		match (payload.get("key").and_then(|v| v.as_str()), payload.get("value")) {
			(Some(attr), Some(value)) => vec![(attr.to_string(), value.to_string())],
			_ => Vec::new(),
		}
	}
}

/// Builds an [`Engine`] wired to fresh in-memory [`MemoryStore`]/[`MemoryBroker`]
/// instances and the given handlers.
pub fn test_engine(handlers: TestHandlers) -> (Engine, Arc<MemoryStore>) {
	let _ = tracing_subscriber::fmt()
		.with_env_filter("info")
		.with_ansi(false)
		.with_test_writer()
		.try_init();

	let store = Arc::new(MemoryStore::new());
	let broker = Arc::new(MemoryBroker::new());
	let engine = Engine::new(store.clone(), broker, Arc::new(handlers), EngineConfig::default());
	(engine, store)
}
