//! INonLeafNodeTask (SUB_DAG) and ITemplateDAGInstance (ROOT) — design doc
//! §4.A. `start` is just a status flip plus starting `root_dag`; completion
//! is driven from below via the owning task's `notify`/`on_complete`.

use crate::engine::Engine;
use crate::error::{WorkflowError, WorkflowResult};
use crate::id::Id;
use crate::instance::WorkflowInstance;
use crate::task::{MonitorPolicy, Task, TaskKind, TaskStatus};

/// Runtime-parameter name a `MonitoredProcessTemplateDAGInstance` reads to
/// learn its monitor's deadline (`COMPLETE_BY_KEY` in the original).
const COMPLETE_BY_KEY: &str = "complete_by_time";

pub async fn begin(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id) -> WorkflowResult<()> {
	enter(engine, instance, task_id).await
}

pub async fn begin_root(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id) -> WorkflowResult<()> {
	setup_monitoring_task(engine, instance, task_id).await?;
	enter(engine, instance, task_id).await
}

/// `MonitoredProcessTemplateDAGInstance::setup_monitoring_task` (mirroring
/// `setup_max_run_duration`): if `COMPLETE_BY_KEY` is set on the blackboard
/// and no companion monitor exists yet, spawn a `SkipOnMaxDuration` monitor
/// watching this root and register it as its trigger and monitoring
/// companion, so root cleanup completes it alongside the root (§4.D step 5).
async fn setup_monitoring_task(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id) -> WorkflowResult<()> {
	let already_armed = instance
		.get_task(task_id)
		.ok_or(WorkflowError::MissingTask(task_id))?
		.monitoring_task_id
		.is_some();
	if already_armed {
		return Ok(());
	}

	let Some(time_to_execute) = instance
		.runtime_parameters
		.get(COMPLETE_BY_KEY)
		.and_then(|v| v.as_i64())
	else {
		return Ok(());
	};

	let mut monitor = Task::new(TaskKind::Monitor {
		time_to_execute,
		monitored_task_id: task_id,
		policy: MonitorPolicy::SkipOnMaxDuration,
	});
	monitor.status = TaskStatus::Executing;
	let monitor_id = monitor.id;

	instance.add_task(monitor);
	instance
		.get_task_mut(task_id)
		.ok_or(WorkflowError::MissingTask(task_id))?
		.monitoring_task_id = Some(monitor_id);

	engine.persist(instance).await?;
	engine
		.store
		.store_trigger_instance(instance.id, monitor_id, time_to_execute)
		.await
		.map_err(WorkflowError::StoreTransient)?;
	engine
		.store
		.set_monitoring_task(instance.id, task_id, monitor_id)
		.await
		.map_err(WorkflowError::StoreTransient)
}

async fn enter(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id) -> WorkflowResult<()> {
	let root_dag = instance
		.get_task(task_id)
		.ok_or(WorkflowError::MissingTask(task_id))?
		.root_dag;

	engine.persist(instance).await?;

	match root_dag {
		Some(child_id) => crate::engine::start(engine, instance, child_id).await,
		// An empty sub-DAG/root completes immediately.
		None => crate::cascade::on_complete(engine, instance, task_id, TaskStatus::Completed, true).await,
	}
}
