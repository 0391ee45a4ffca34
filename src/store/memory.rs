use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::id::Id;
use crate::instance::WorkflowInstance;

use super::{CorrelationKey, Store};

/// In-memory reference [`Store`] implementation. Not durable; exists for
/// tests and as a runnable example of the collaborator contract.
#[derive(Default)]
pub struct MemoryStore {
	instances: RwLock<HashMap<Id, WorkflowInstance>>,
	/// task id -> owning workflow id, so a task id can resolve to its instance.
	owner: RwLock<HashMap<Id, Id>>,
	correlation: RwLock<HashMap<CorrelationKey, HashSet<(Id, Id)>>>,
	triggers: RwLock<BTreeMap<(i64, Id, Id), ()>>,
	monitors: RwLock<HashMap<(Id, Id), Id>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `workflow` for the first time, indexing every task's owner.
	pub async fn seed(&self, workflow: WorkflowInstance) {
		let mut owner = self.owner.write().await;
		for task_id in workflow.tasks.keys() {
			owner.insert(*task_id, workflow.id);
		}
		self.instances.write().await.insert(workflow.id, workflow);
	}

}

#[async_trait]
impl Store for MemoryStore {
	async fn update_instance(&self, workflow: &WorkflowInstance) -> anyhow::Result<()> {
		let mut owner = self.owner.write().await;
		for task_id in workflow.tasks.keys() {
			owner.insert(*task_id, workflow.id);
		}
		self
			.instances
			.write()
			.await
			.insert(workflow.id, workflow.clone());
		Ok(())
	}

	async fn remove_root_template_instance(&self, root_id: Id) -> anyhow::Result<()> {
		if let Some(workflow) = self.instances.write().await.remove(&root_id) {
			let mut owner = self.owner.write().await;
			for task_id in workflow.tasks.keys() {
				owner.remove(task_id);
			}
		}
		Ok(())
	}

	async fn store_trigger_instance(
		&self,
		workflow_id: Id,
		task_id: Id,
		trigger_time: i64,
	) -> anyhow::Result<()> {
		self
			.triggers
			.write()
			.await
			.insert((trigger_time, workflow_id, task_id), ());
		Ok(())
	}

	async fn process_trigger_task_complete(&self, workflow_id: Id, task_id: Id) -> anyhow::Result<()> {
		self
			.triggers
			.write()
			.await
			.retain(|(_, w, t), _| !(*w == workflow_id && *t == task_id));
		Ok(())
	}

	async fn execute_system_timer_task(&self, now: i64) -> anyhow::Result<Vec<(i64, Id, Id)>> {
		// Keys are ordered (trigger_time, workflow_id, task_id), so the ready
		// triggers are exactly the ascending prefix with trigger_time <= now.
		Ok(self
			.triggers
			.read()
			.await
			.keys()
			.take_while(|(trigger_time, _, _)| *trigger_time <= now)
			.copied()
			.collect())
	}

	async fn get_instance(&self, id: Id) -> anyhow::Result<Option<WorkflowInstance>> {
		let instances = self.instances.read().await;
		if let Some(workflow) = instances.get(&id) {
			return Ok(Some(workflow.clone()));
		}
		let owner = self.owner.read().await;
		if let Some(workflow_id) = owner.get(&id) {
			return Ok(instances.get(workflow_id).cloned());
		}
		Ok(None)
	}

	async fn update_correlatable_key_for_task(
		&self,
		workflow_id: Id,
		sensor_id: Id,
		old_key: Option<CorrelationKey>,
		new_key: Option<CorrelationKey>,
	) -> anyhow::Result<()> {
		let mut correlation = self.correlation.write().await;
		if let Some(old_key) = old_key {
			if let Some(bucket) = correlation.get_mut(&old_key) {
				bucket.remove(&(workflow_id, sensor_id));
				if bucket.is_empty() {
					correlation.remove(&old_key);
				}
			}
		}
		if let Some(new_key) = new_key {
			correlation
				.entry(new_key)
				.or_default()
				.insert((workflow_id, sensor_id));
		}
		Ok(())
	}

	async fn remove_task_from_correlatable_keys_table(
		&self,
		workflow_id: Id,
		task_id: Id,
	) -> anyhow::Result<()> {
		let mut correlation = self.correlation.write().await;
		correlation.retain(|_, bucket| {
			bucket.remove(&(workflow_id, task_id));
			!bucket.is_empty()
		});
		Ok(())
	}

	async fn get_tasks_by_correlatable_key(
		&self,
		key: &CorrelationKey,
		get_completed: bool,
	) -> anyhow::Result<Vec<(Id, Id)>> {
		let correlation = self.correlation.read().await;
		let Some(bucket) = correlation.get(key) else {
			return Ok(Vec::new());
		};

		if get_completed {
			return Ok(bucket.iter().copied().collect());
		}

		let instances = self.instances.read().await;
		Ok(bucket
			.iter()
			.copied()
			.filter(|(workflow_id, _)| {
				instances
					.get(workflow_id)
					.map(|w| !w.is_fully_terminal())
					.unwrap_or(false)
			})
			.collect())
	}

	async fn get_monitoring_task(&self, workflow_id: Id, task_id: Id) -> anyhow::Result<Option<Id>> {
		Ok(self.monitors.read().await.get(&(workflow_id, task_id)).copied())
	}

	async fn set_monitoring_task(&self, workflow_id: Id, monitored_task_id: Id, monitor_id: Id) -> anyhow::Result<()> {
		self
			.monitors
			.write()
			.await
			.insert((workflow_id, monitored_task_id), monitor_id);
		Ok(())
	}
}
