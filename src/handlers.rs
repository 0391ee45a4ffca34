//! Business-logic lookup table. Tasks stay plain, serializable data (design
//! note §9); the side effects a template author attaches to an executor,
//! decision, interval, or sensor are registered here by name and resolved
//! at dispatch time, mirroring how the teacher resolves a workflow/activity
//! implementation from its `RegistryHandle` by name.

use async_trait::async_trait;

use crate::id::Id;
use crate::instance::RuntimeParameters;

#[async_trait]
pub trait Handlers: Send + Sync {
	/// Runs an executor's (or trigger's, or interval's) business logic.
	/// `Err` becomes FAILURE; `Ok` becomes COMPLETED with the returned value
	/// stored as the task's output.
	async fn execute(
		&self,
		handler: &str,
		params: &RuntimeParameters,
	) -> anyhow::Result<serde_json::Value>;

	/// Picks the next task id for a decision task out of its `next_dags`.
	/// `None` leaves every successor unadvanced (all get skipped).
	async fn evaluate(&self, handler: &str, params: &RuntimeParameters, candidates: &[Id]) -> Option<Id>;

	/// One firing of an interval task. `true` means finish now.
	async fn interval_execute(&self, handler: &str, params: &RuntimeParameters) -> bool;

	/// Delivers an inbound event to a sensor's `on_message`. Returns whether
	/// the sensor is now fully satisfied. May mutate `params` (the workflow
	/// blackboard).
	async fn on_message(
		&self,
		stream: &str,
		params: &mut RuntimeParameters,
		event: &serde_json::Value,
	) -> bool;

	/// Candidate `(attribute, value)` pairs a listener on `stream` extracts
	/// from an inbound payload, used to probe the correlation index.
	fn correlatable_keys_from_payload(
		&self,
		stream: &str,
		payload: &serde_json::Value,
	) -> Vec<(String, String)>;
}
