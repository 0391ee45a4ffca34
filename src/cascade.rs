//! Completion cascade (component D): `on_complete`, parent `notify`, and
//! root cleanup.

use crate::engine::Engine;
use crate::error::{WorkflowError, WorkflowResult};
use crate::id::Id;
use crate::instance::WorkflowInstance;
use crate::metrics;
use crate::task::{JoinOperator, TaskKind, TaskStatus, TaskType};

/// `t.on_complete(status, iterate)` (design doc §4.D).
///
/// Boxed because this recurses through `start` (successor dispatch) and
/// `notify` (parent dispatch), both of which call back into `on_complete`;
/// an unboxed `async fn` cycle like this can't have a finite-sized future.
pub fn on_complete<'a>(
	engine: &'a Engine,
	instance: &'a mut WorkflowInstance,
	task_id: Id,
	status: TaskStatus,
	iterate: bool,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = WorkflowResult<()>> + Send + 'a>> {
	Box::pin(on_complete_inner(engine, instance, task_id, status, iterate))
}

async fn on_complete_inner(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	task_id: Id,
	status: TaskStatus,
	iterate: bool,
) -> WorkflowResult<()> {
	let changed = {
		let task = instance
			.get_task_mut(task_id)
			.ok_or(WorkflowError::MissingTask(task_id))?;
		if task.status != status {
			task.status = status;
			if task.time_completed == 0 {
				task.time_completed = crate::utils::time::now();
			}
			task.touch();
			true
		} else {
			false
		}
	};

	if changed {
		engine.persist(instance).await?;
		let kind_label = instance.get_task(task_id).map(|t| t.kind.label()).unwrap_or("?");
		metrics::TASK_COMPLETED
			.with_label_values(&[kind_label, &status.to_string()])
			.inc();
	}

	if !iterate {
		tracing::debug!(%task_id, "on_complete: iterate=false, not advancing");
		return Ok(());
	}

	// Step 3: advance the first non-skipped successor and stop. Transitive
	// fan-out happens through that successor's own completion.
	let next_dags = instance
		.get_task(task_id)
		.map(|t| t.next_dags.clone())
		.unwrap_or_default();

	let mut advanced = false;
	for next_id in next_dags {
		tokio::task::yield_now().await;

		let Some(next) = instance.get_task(next_id) else {
			tracing::warn!(missing=%next_id, from=%task_id, "cascade: successor missing, skipping");
			continue;
		};
		if next.status == TaskStatus::Skipped {
			continue;
		}

		advanced = true;
		crate::engine::start(engine, instance, next_id).await?;
		break;
	}

	if advanced {
		return Ok(());
	}

	// Step 4: propagate upward to the parent.
	let parent_id = instance.get_task(task_id).and_then(|t| t.parent_id);
	if let Some(parent_id) = parent_id {
		let time_completed = instance
			.get_task(task_id)
			.map(|t| t.time_completed)
			.unwrap_or_default();

		let Some(parent) = instance.get_task_mut(parent_id) else {
			tracing::error!(%parent_id, %task_id, "cascade: parent missing, cannot notify");
			return Ok(());
		};
		parent.time_completed = time_completed;

		return notify(engine, instance, parent_id, status).await;
	}

	// Step 5: this is the root — run cleanup.
	let task_type = instance.get_task(task_id).map(|t| t.task_type());
	if task_type == Some(TaskType::Root) {
		root_cleanup(engine, instance).await?;
	}

	Ok(())
}

/// Parent-side hook (design doc §4.D/§4.G). A non-composite parent forwards
/// straight to its own `on_complete`; a composite parent applies join
/// semantics first.
pub async fn notify(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	parent_id: Id,
	status: TaskStatus,
) -> WorkflowResult<()> {
	let is_composite = matches!(
		instance.get_task(parent_id).map(|t| &t.kind),
		Some(TaskKind::ParallelComposite { .. })
	);

	if is_composite {
		crate::task::composite::notify(engine, instance, parent_id, status).await
	} else {
		on_complete(engine, instance, parent_id, status, true).await
	}
}

/// For each task in the instance: drop its correlation entries, complete
/// its monitoring companion if any, then (if configured) delete the
/// instance. Runs even if some task remains non-terminal — that's logged,
/// not fatal.
async fn root_cleanup(engine: &Engine, instance: &mut WorkflowInstance) -> WorkflowResult<()> {
	tracing::debug!(workflow_id=%instance.id, "running root cleanup");

	let task_ids: Vec<Id> = instance.tasks.keys().copied().collect();
	let mut any_non_terminal = false;

	for task_id in task_ids {
		tokio::task::yield_now().await;

		let terminal = instance.get_task(task_id).map(|t| t.is_terminal()).unwrap_or(true);
		if !terminal {
			any_non_terminal = true;
		}

		engine
			.store
			.remove_task_from_correlatable_keys_table(instance.id, task_id)
			.await
			.map_err(WorkflowError::StoreTransient)?;

		if let Some(monitor_id) = engine
			.store
			.get_monitoring_task(instance.id, task_id)
			.await
			.map_err(WorkflowError::StoreTransient)?
		{
			on_complete(engine, instance, monitor_id, TaskStatus::Completed, true).await?;
			engine
				.store
				.process_trigger_task_complete(instance.id, monitor_id)
				.await
				.map_err(WorkflowError::StoreTransient)?;
		}
	}

	if instance.delete_on_complete {
		engine
			.store
			.remove_root_template_instance(instance.id)
			.await
			.map_err(WorkflowError::StoreTransient)?;
		tracing::info!(workflow_id=%instance.id, "removed root instance");
	}

	if any_non_terminal {
		tracing::info!(workflow_id=%instance.id, "one or more sub dags are still in a non-terminal state");
	}

	Ok(())
}

/// Shared by `ParallelCompositeTask::notify` — whether `operator` considers
/// the composite finished given its children's statuses.
pub(crate) fn join_satisfied(operator: JoinOperator, child_statuses: &[TaskStatus]) -> bool {
	match operator {
		JoinOperator::JoinAll => child_statuses.iter().all(|s| s.is_terminal()),
		JoinOperator::AtLeastOne => child_statuses.iter().any(|s| s.is_terminal()),
	}
}
