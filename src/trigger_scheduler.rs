//! Timer/trigger scheduler (component F, design doc §4.F). Engine-internal
//! `SystemTimerTask` equivalent: periodically asks the store for every
//! trigger due by now and re-enters `start` on each target task.

use crate::engine::Engine;
use crate::error::{WorkflowError, WorkflowResult};
use crate::id::Id;
use crate::metrics;

/// Fires every trigger with `trigger_time <= now`, ascending by trigger
/// time. A missing or already-terminal target just drops the trigger;
/// `start` itself decides whether to complete or re-arm.
pub async fn tick(engine: &Engine) -> WorkflowResult<usize> {
	let now = crate::utils::time::now();
	let due = engine
		.store
		.execute_system_timer_task(now)
		.await
		.map_err(WorkflowError::StoreTransient)?;

	let mut fired = 0;
	for (_, workflow_id, task_id) in due {
		if let Err(err) = fire_one(engine, workflow_id, task_id).await {
			tracing::error!(%workflow_id, %task_id, error=%err, "trigger firing failed");
			continue;
		}
		fired += 1;
	}

	Ok(fired)
}

async fn fire_one(engine: &Engine, workflow_id: Id, task_id: Id) -> WorkflowResult<()> {
	let Some(mut instance) = engine
		.store
		.get_instance(workflow_id)
		.await
		.map_err(WorkflowError::StoreTransient)?
	else {
		tracing::warn!(%workflow_id, %task_id, "trigger fired for unknown workflow, dropping");
		return Ok(());
	};

	let terminal = instance.get_task(task_id).map(|t| t.is_terminal()).unwrap_or(true);
	if terminal {
		engine
			.store
			.process_trigger_task_complete(workflow_id, task_id)
			.await
			.map_err(WorkflowError::StoreTransient)?;
		return Ok(());
	}

	let kind_label = instance.get_task(task_id).map(|t| t.kind.label()).unwrap_or("?");
	metrics::TRIGGERS_FIRED.with_label_values(&[kind_label]).inc();

	crate::engine::start(engine, &mut instance, task_id).await
}
