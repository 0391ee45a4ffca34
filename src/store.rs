//! The store collaborator contract (design doc §6). Out of scope: a real
//! durable backend. This module defines the trait every backend must
//! satisfy and re-exports [`crate::store::memory::MemoryStore`], an
//! in-process reference implementation used by the engine's own tests.

pub mod memory;

use async_trait::async_trait;

use crate::id::Id;
use crate::instance::WorkflowInstance;

/// `(attr_name, value_with_stream_suffix)` — the correlation index key shape
/// from design doc §4.E. The stream suffix is baked into `value` by the
/// caller (`"{value}_{stream}"`) so the same attribute can be watched on
/// several streams without colliding.
pub type CorrelationKey = (String, String);

#[async_trait]
pub trait Store: Send + Sync {
	/// Idempotent upsert keyed by `workflow.id`.
	async fn update_instance(&self, workflow: &WorkflowInstance) -> anyhow::Result<()>;

	/// Delete a root instance and all its descendants.
	async fn remove_root_template_instance(&self, root_id: Id) -> anyhow::Result<()>;

	/// Register or refresh a trigger under `(trigger_time, workflow_id, task_id)`.
	async fn store_trigger_instance(
		&self,
		workflow_id: Id,
		task_id: Id,
		trigger_time: i64,
	) -> anyhow::Result<()>;

	/// Delete a pending trigger.
	async fn process_trigger_task_complete(&self, workflow_id: Id, task_id: Id) -> anyhow::Result<()>;

	/// Every trigger with `trigger_time <= now`, ascending by trigger time.
	async fn execute_system_timer_task(&self, now: i64) -> anyhow::Result<Vec<(i64, Id, Id)>>;

	/// Random-access read of the workflow instance owning `id` (a workflow id
	/// or the id of any task within it).
	async fn get_instance(&self, id: Id) -> anyhow::Result<Option<WorkflowInstance>>;

	/// Upsert a correlation-index entry for `sensor_id`, atomically removing
	/// the entry under `old_key` if present.
	async fn update_correlatable_key_for_task(
		&self,
		workflow_id: Id,
		sensor_id: Id,
		old_key: Option<CorrelationKey>,
		new_key: Option<CorrelationKey>,
	) -> anyhow::Result<()>;

	/// Used during root cleanup to drop all of a task's correlation entries.
	async fn remove_task_from_correlatable_keys_table(
		&self,
		workflow_id: Id,
		task_id: Id,
	) -> anyhow::Result<()>;

	/// All `(workflow_id, task_id)` pairs registered under `key`, including
	/// ones belonging to already-completed workflows (needed for late events
	/// and `reprocess_on_message`).
	async fn get_tasks_by_correlatable_key(
		&self,
		key: &CorrelationKey,
		get_completed: bool,
	) -> anyhow::Result<Vec<(Id, Id)>>;

	/// The companion monitoring task of `task_id`, if one was spawned.
	async fn get_monitoring_task(&self, workflow_id: Id, task_id: Id) -> anyhow::Result<Option<Id>>;

	/// Registers `monitor_id` as the monitoring companion of `monitored_task_id`
	/// (`setup_monitoring_task`/`setup_max_run_duration` in the original).
	async fn set_monitoring_task(&self, workflow_id: Id, monitored_task_id: Id, monitor_id: Id) -> anyhow::Result<()>;
}
