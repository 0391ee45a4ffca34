//! TriggerTask / IntervalTask / MonitoringTask (design doc §4.A, §4.F).
//!
//! Each `execute_*` is invoked both the first time the task is reached from
//! its predecessor and again on every later scheduler tick until it returns
//! `Some(status)`. `None` means "still pending", having (re)armed itself in
//! the trigger index.

use crate::engine::Engine;
use crate::error::{WorkflowError, WorkflowResult};
use crate::id::Id;
use crate::instance::WorkflowInstance;
use crate::task::{MonitorPolicy, TaskKind, TaskStatus};

/// Marks every still-pending task on the root-to-`stop_at` prefix SKIPPED
/// (non-iterating), per design doc §4.E/§4.G. Shared by `allow_skip_to`
/// sensor delivery and `SkipOnMaxDurationTask`.
pub(crate) async fn skip_pending_prefix(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	stop_at: Id,
) -> WorkflowResult<()> {
	let mut prefix = Vec::new();
	crate::correlation::collect_prefix(instance, instance.root_id, stop_at, &mut prefix);

	for task_id in prefix {
		if task_id == stop_at {
			continue;
		}
		let pending = instance
			.get_task(task_id)
			.map(|t| matches!(t.status, TaskStatus::NotStarted | TaskStatus::Executing))
			.unwrap_or(false);
		if pending {
			crate::cascade::on_complete(engine, instance, task_id, TaskStatus::Skipped, false).await?;
		}
	}

	Ok(())
}

async fn arm(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id, time_to_execute: i64) -> WorkflowResult<()> {
	engine.persist(instance).await?;
	engine
		.store
		.store_trigger_instance(instance.id, task_id, time_to_execute)
		.await
		.map_err(WorkflowError::StoreTransient)
}

async fn disarm(engine: &Engine, instance: &WorkflowInstance, task_id: Id) -> WorkflowResult<()> {
	engine
		.store
		.process_trigger_task_complete(instance.id, task_id)
		.await
		.map_err(WorkflowError::StoreTransient)
}

/// One-shot `TriggerTask`. No-op (re-armed) until `now >= time_to_execute`,
/// then behaves like an `ExecutorTask`.
pub async fn execute(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	task_id: Id,
) -> WorkflowResult<Option<TaskStatus>> {
	let TaskKind::Trigger { time_to_execute, handler } = instance
		.get_task(task_id)
		.ok_or(WorkflowError::MissingTask(task_id))?
		.kind
		.clone()
	else {
		return Err(WorkflowError::UnsupportedOp {
			kind: "non-trigger",
			op: "execute",
		});
	};

	let now = crate::utils::time::now();
	if now < time_to_execute {
		arm(engine, instance, task_id, time_to_execute).await?;
		return Ok(None);
	}

	// Disarm before propagating a handler failure: the trigger is terminal
	// either way and must not be left re-firing in the trigger index.
	let result = run_handler(engine, instance, task_id, &handler).await;
	disarm(engine, instance, task_id).await?;
	Ok(Some(result?))
}

/// `IntervalTask`: re-arms at `now + interval_execute_period` until
/// `interval_execute` reports completion or `time_to_force_complete` passes.
pub async fn execute_interval(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	task_id: Id,
) -> WorkflowResult<Option<TaskStatus>> {
	let TaskKind::Interval {
		time_to_execute,
		interval_execute_period,
		time_to_force_complete,
		handler,
	} = instance
		.get_task(task_id)
		.ok_or(WorkflowError::MissingTask(task_id))?
		.kind
		.clone()
	else {
		return Err(WorkflowError::UnsupportedOp {
			kind: "non-interval",
			op: "execute",
		});
	};

	let now = crate::utils::time::now();
	if now < time_to_execute {
		arm(engine, instance, task_id, time_to_execute).await?;
		return Ok(None);
	}

	let finished = engine
		.handlers
		.interval_execute(&handler, &instance.runtime_parameters)
		.await;
	let force_complete = time_to_force_complete.map(|deadline| now >= deadline).unwrap_or(false);

	if finished || force_complete {
		disarm(engine, instance, task_id).await?;
		return Ok(Some(TaskStatus::Completed));
	}

	let next_fire = now + interval_execute_period;
	if let Some(task) = instance.get_task_mut(task_id) {
		if let TaskKind::Interval { time_to_execute, .. } = &mut task.kind {
			*time_to_execute = next_fire;
		}
		task.touch();
	}
	arm(engine, instance, task_id, next_fire).await?;
	Ok(None)
}

/// `MonitoringTask` / `SkipOnMaxDurationTask`: if the monitored task is
/// still EXECUTING when the deadline fires, skip its still-pending prefix
/// and itself; otherwise there is nothing to do.
pub async fn execute_monitor(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	task_id: Id,
) -> WorkflowResult<Option<TaskStatus>> {
	let TaskKind::Monitor {
		time_to_execute,
		monitored_task_id,
		policy,
	} = instance
		.get_task(task_id)
		.ok_or(WorkflowError::MissingTask(task_id))?
		.kind
		.clone()
	else {
		return Err(WorkflowError::UnsupportedOp {
			kind: "non-monitor",
			op: "execute",
		});
	};

	let now = crate::utils::time::now();
	if now < time_to_execute {
		arm(engine, instance, task_id, time_to_execute).await?;
		return Ok(None);
	}

	let MonitorPolicy::SkipOnMaxDuration = policy;
	let monitored_status = instance.get_task(monitored_task_id).map(|t| t.status);
	if monitored_status == Some(TaskStatus::Executing) {
		skip_pending_prefix(engine, instance, monitored_task_id).await?;
		crate::cascade::on_complete(engine, instance, monitored_task_id, TaskStatus::Skipped, true).await?;
	}

	disarm(engine, instance, task_id).await?;
	Ok(Some(TaskStatus::Completed))
}

async fn run_handler(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	task_id: Id,
	handler: &str,
) -> WorkflowResult<TaskStatus> {
	match engine.handlers.execute(handler, &instance.runtime_parameters).await {
		Ok(output) => {
			if let Some(task) = instance.get_task_mut(task_id) {
				task.output = Some(output);
			}
			Ok(TaskStatus::Completed)
		}
		Err(err) => {
			tracing::warn!(%task_id, handler, error=%err, "trigger handler failed");
			if let Some(task) = instance.get_task_mut(task_id) {
				task.output = Some(serde_json::json!({"error": err.to_string()}));
			}
			Err(WorkflowError::ExecuteFailure(task_id, err))
		}
	}
}
