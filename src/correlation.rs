//! Correlation index & sensor dispatch (component E).

use crate::engine::Engine;
use crate::error::{WorkflowError, WorkflowResult};
use crate::id::Id;
use crate::instance::WorkflowInstance;
use crate::metrics;
use crate::task::{TaskKind, TaskStatus};

fn sensor_key(attr: &str, value: &str, stream: &str) -> (String, String) {
	(attr.to_string(), format!("{value}_{stream}"))
}

fn sensor_stream(instance: &WorkflowInstance, sensor_id: Id) -> Option<String> {
	match instance.get_task(sensor_id).map(|t| &t.kind) {
		Some(TaskKind::Sensor { stream, .. }) => Some(stream.clone()),
		_ => None,
	}
}

/// Registers (or refreshes) `sensor_id`'s entry in the correlation index
/// against its current watched value. Called when a sensor enters
/// EXECUTING and whenever [`refresh_sensors`] finds a drifted value.
pub async fn register_sensor(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	sensor_id: Id,
) -> WorkflowResult<()> {
	let Some(task) = instance.get_task(sensor_id) else {
		return Err(WorkflowError::MissingTask(sensor_id));
	};
	let Some(attr) = task.correlatable_key.clone() else {
		return Ok(());
	};
	let Some(stream) = sensor_stream(instance, sensor_id) else {
		return Ok(());
	};

	let old_value = instance
		.sensor_tasks_to_correlatable_map
		.get(&sensor_id)
		.and_then(|(_, v)| v.clone());
	let new_value = instance.runtime_parameters.get(&attr).map(|v| v.to_string());

	let old_key = old_value.map(|v| sensor_key(&attr, &v, &stream));
	let new_key = new_value.clone().map(|v| sensor_key(&attr, &v, &stream));

	instance
		.sensor_tasks_to_correlatable_map
		.insert(sensor_id, (attr, new_value));

	engine
		.store
		.update_correlatable_key_for_task(instance.id, sensor_id, old_key, new_key)
		.await
		.map_err(WorkflowError::StoreTransient)
}

/// Re-registers every live sensor whose watched blackboard value changed.
/// Called after any `on_message`/`execute` that may have mutated
/// `runtime_parameters`.
pub async fn refresh_sensors(engine: &Engine, instance: &mut WorkflowInstance) -> WorkflowResult<()> {
	for (sensor_id, attr, old_value, new_value) in instance.reconcile_sensor_keys() {
		let Some(stream) = sensor_stream(instance, sensor_id) else {
			continue;
		};
		let old_key = old_value.map(|v| sensor_key(&attr, &v, &stream));
		let new_key = new_value.map(|v| sensor_key(&attr, &v, &stream));
		engine
			.store
			.update_correlatable_key_for_task(instance.id, sensor_id, old_key, new_key)
			.await
			.map_err(WorkflowError::StoreTransient)?;
	}
	Ok(())
}

/// DFS from the workflow's root along `next_dags` (entering sub-DAGs via
/// `root_dag`), collecting every task up to and including `stop_at` in
/// visit order.
pub(crate) fn collect_prefix(instance: &WorkflowInstance, start: Id, stop_at: Id, out: &mut Vec<Id>) -> bool {
	let Some(task) = instance.get_task(start) else {
		return false;
	};

	if let Some(root_dag) = task.root_dag {
		if collect_prefix(instance, root_dag, stop_at, out) {
			return true;
		}
	}

	out.push(start);
	if start == stop_at {
		return true;
	}

	for &next in &task.next_dags {
		if collect_prefix(instance, next, stop_at, out) {
			return true;
		}
	}

	false
}

/// Marks every still-pending predecessor of `sensor_id` SKIPPED
/// (non-iterating) so an out-of-order `allow_skip_to` match doesn't fight
/// the explicit re-entry on the sensor itself.
async fn skip_predecessors(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	sensor_id: Id,
) -> WorkflowResult<()> {
	crate::task::trigger::skip_pending_prefix(engine, instance, sensor_id).await
}

async fn deliver_event(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	sensor_id: Id,
	stream: &str,
	event: &serde_json::Value,
) -> WorkflowResult<bool> {
	let satisfied = engine
		.handlers
		.on_message(stream, &mut instance.runtime_parameters, event)
		.await;
	refresh_sensors(engine, instance).await?;

	if satisfied {
		crate::cascade::on_complete(engine, instance, sensor_id, TaskStatus::Completed, true).await?;
	} else {
		engine.persist(instance).await?;
	}

	Ok(true)
}

/// Applies the §4.E delivery policy table for one resolved `(workflow,
/// sensor task)` pair. Returns whether the event was actually processed
/// (used to decide whether `match_only_one` should stop the scan).
async fn deliver(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	sensor_id: Id,
	event: &serde_json::Value,
) -> WorkflowResult<bool> {
	let Some(task) = instance.get_task(sensor_id) else {
		return Err(WorkflowError::MissingTask(sensor_id));
	};
	let status = task.status;
	let allow_skip_to = task.allow_skip_to;
	let reprocess_on_message = task.reprocess_on_message;
	let Some(stream) = sensor_stream(instance, sensor_id) else {
		return Ok(false);
	};

	match status {
		TaskStatus::NotStarted if allow_skip_to => {
			skip_predecessors(engine, instance, sensor_id).await?;
			if let Some(task) = instance.get_task_mut(sensor_id) {
				task.status = TaskStatus::Executing;
				task.time_submitted = crate::utils::time::now();
				task.touch();
			}
			engine.persist(instance).await?;
			deliver_event(engine, instance, sensor_id, &stream, event).await
		}
		TaskStatus::NotStarted => {
			let err = WorkflowError::DeliverySkipped(format!("sensor {sensor_id} received event out of order"));
			tracing::debug!(%sensor_id, %err);
			Ok(false)
		}
		TaskStatus::Executing => deliver_event(engine, instance, sensor_id, &stream, event).await,
		TaskStatus::Completed if reprocess_on_message => {
			engine
				.handlers
				.on_message(&stream, &mut instance.runtime_parameters, event)
				.await;
			refresh_sensors(engine, instance).await?;
			engine.persist(instance).await?;
			Ok(true)
		}
		TaskStatus::Completed => {
			crate::engine::start(engine, instance, sensor_id).await?;
			Ok(true)
		}
		TaskStatus::Skipped if allow_skip_to => {
			deliver_event(engine, instance, sensor_id, &stream, event).await
		}
		TaskStatus::Skipped | TaskStatus::Failure | TaskStatus::Stopped | TaskStatus::Submitted => {
			let err = WorkflowError::DeliverySkipped(format!("sensor {sensor_id} is {status} and not allow_skip_to"));
			tracing::debug!(%sensor_id, %err);
			Ok(false)
		}
	}
}

/// Resolves an inbound event on `stream` to zero-or-more sensor tasks across
/// all live (and, for late/`reprocess_on_message` delivery, completed)
/// workflow instances, and applies the delivery policy to each.
pub async fn dispatch_event(engine: &Engine, stream: &str, event: serde_json::Value) -> WorkflowResult<()> {
	use itertools::Itertools;
	let candidates = engine.handlers.correlatable_keys_from_payload(stream, &event);

	for (attr, value) in candidates.into_iter().unique() {
		let key = sensor_key(&attr, &value, stream);
		let pairs = engine
			.store
			.get_tasks_by_correlatable_key(&key, true)
			.await
			.map_err(WorkflowError::StoreTransient)?;

		let mut resolved = Vec::new();
		for (workflow_id, task_id) in pairs {
			match engine.store.get_instance(workflow_id).await.map_err(WorkflowError::StoreTransient)? {
				Some(instance) => resolved.push((instance, task_id)),
				None => {
					let err = WorkflowError::DeliverySkipped(format!("workflow {workflow_id} no longer exists"));
					tracing::debug!(%workflow_id, %task_id, %err);
				}
			}
		}
		// Order is unspecified by the design when `match_only_one` and
		// `allow_skip_to` both apply (open question); this engine resolves
		// ties by the owning workflow's creation time, oldest first.
		resolved.sort_by_key(|(instance, task_id)| (instance.root().time_created, *task_id));

		let mut match_only_one_hit = false;
		for (mut instance, task_id) in resolved {
			let bound_stream = sensor_stream(&instance, task_id);
			if bound_stream.as_deref() != Some(stream) {
				let err = WorkflowError::DeliverySkipped(format!("sensor {task_id} is not bound to stream {stream}"));
				tracing::debug!(%task_id, %stream, %err);
				continue;
			}

			let match_only_one =
				matches!(instance.get_task(task_id).map(|t| &t.kind), Some(TaskKind::Sensor { match_only_one: true, .. }));

			let processed = deliver(engine, &mut instance, task_id, &event).await?;
			metrics::DISPATCH_EVENTS
				.with_label_values(&[stream, if processed { "delivered" } else { "dropped" }])
				.inc();

			if processed && match_only_one {
				match_only_one_hit = true;
				break;
			}
		}
		if match_only_one_hit {
			break;
		}
	}

	Ok(())
}
