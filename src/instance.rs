//! Workflow instance container (component B).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::id::Id;
use crate::task::{Task, TaskKind};

pub type RuntimeParameters = serde_json::Map<String, serde_json::Value>;

/// A rooted DAG in flight. The root task lives in `tasks` like any other;
/// `root_id` just names which entry it is (keeping a single source of
/// truth instead of duplicating the root task outside the map).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
	pub id: Id,
	pub name: String,
	pub root_id: Id,
	pub tasks: BTreeMap<Id, Task>,
	pub runtime_parameters: RuntimeParameters,
	/// sensor task id -> (attribute watched, last-seen value). Used to
	/// detect when the blackboard changed under a live sensor so the
	/// correlation index can be refreshed.
	pub sensor_tasks_to_correlatable_map: HashMap<Id, (String, Option<String>)>,
	pub update_count: u64,
	pub delete_on_complete: bool,
}

impl WorkflowInstance {
	pub fn new(name: impl Into<String>, delete_on_complete: bool) -> Self {
		let mut root = Task::new(TaskKind::Root);
		root.status = crate::task::TaskStatus::NotStarted;
		let root_id = root.id;
		let id = root_id;

		let mut tasks = BTreeMap::new();
		tasks.insert(root_id, root);

		WorkflowInstance {
			id,
			name: name.into(),
			root_id,
			tasks,
			runtime_parameters: RuntimeParameters::new(),
			sensor_tasks_to_correlatable_map: HashMap::new(),
			update_count: 0,
			delete_on_complete,
		}
	}

	pub fn root(&self) -> &Task {
		self.tasks.get(&self.root_id).expect("root task always present")
	}

	pub fn get_task(&self, id: Id) -> Option<&Task> {
		self.tasks.get(&id)
	}

	pub fn get_task_mut(&mut self, id: Id) -> Option<&mut Task> {
		self.tasks.get_mut(&id)
	}

	pub fn add_task(&mut self, task: Task) -> Id {
		let id = task.id;
		self.tasks.insert(id, task);
		id
	}

	/// True iff every task in this instance is terminal (deletion eligibility,
	/// invariant 4).
	pub fn is_fully_terminal(&self) -> bool {
		self.tasks.values().all(|t| t.is_terminal())
	}

	pub fn bump(&mut self) {
		self.update_count += 1;
	}

	/// Finds every live sensor whose watched runtime-parameter value has
	/// drifted from what's recorded in `sensor_tasks_to_correlatable_map`,
	/// updates the map, and returns `(sensor_id, attr, old_value, new_value)`
	/// for each so the caller can re-register it with the correlation index.
	/// Mirrors `_update_global_runtime_parameters` in the original, split out
	/// as plain synchronous bookkeeping so the store call stays the caller's
	/// concern (see [`crate::correlation::refresh_sensors`]).
	pub fn reconcile_sensor_keys(&mut self) -> Vec<(Id, String, Option<String>, Option<String>)> {
		let mut changes = Vec::new();
		let sensor_ids: Vec<Id> = self.sensor_tasks_to_correlatable_map.keys().copied().collect();

		for sensor_id in sensor_ids {
			let Some((attr, old_value)) =
				self.sensor_tasks_to_correlatable_map.get(&sensor_id).cloned()
			else {
				continue;
			};
			let new_value = self.runtime_parameters.get(&attr).map(|v| v.to_string());

			let live = self
				.get_task(sensor_id)
				.map(|t| {
					matches!(
						t.status,
						crate::task::TaskStatus::NotStarted | crate::task::TaskStatus::Executing
					)
				})
				.unwrap_or(false);

			if live && new_value != old_value {
				self
					.sensor_tasks_to_correlatable_map
					.insert(sensor_id, (attr.clone(), new_value.clone()));
				changes.push((sensor_id, attr, old_value, new_value));
			}
		}

		changes
	}
}
