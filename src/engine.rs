//! The engine context and the common `start` contract (design doc §4.A).
//!
//! Mirrors how the teacher threads a database handle and pools through
//! `WorkflowCtx`: collaborators are held as `Arc<dyn Trait>` so the engine
//! itself stays `Clone` and cheap to hand to every spawned workflow task.

use std::sync::Arc;

use crate::broker::Broker;
use crate::config::EngineConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::handlers::Handlers;
use crate::id::Id;
use crate::instance::WorkflowInstance;
use crate::metrics;
use crate::store::Store;
use crate::task::{TaskKind, TaskStatus};

const MAX_PERSIST_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct Engine {
	pub store: Arc<dyn Store>,
	pub broker: Arc<dyn Broker>,
	pub handlers: Arc<dyn Handlers>,
	pub config: EngineConfig,
}

impl Engine {
	pub fn new(
		store: Arc<dyn Store>,
		broker: Arc<dyn Broker>,
		handlers: Arc<dyn Handlers>,
		config: EngineConfig,
	) -> Self {
		Engine {
			store,
			broker,
			handlers,
			config,
		}
	}

	/// Starts a new, empty workflow instance named `name`, defaulting its
	/// `delete_on_complete` flag from [`EngineConfig::delete_on_complete`]
	/// rather than leaving every caller to hardcode it.
	pub fn new_instance(&self, name: impl Into<String>) -> WorkflowInstance {
		WorkflowInstance::new(name, self.config.delete_on_complete)
	}

	/// Persists `instance`, retrying a bounded number of times on a
	/// transient store failure. Mirrors the teacher's `DB_ACTION_RETRY`
	/// backoff around `WorkflowCtx`'s database writes.
	pub async fn persist(&self, instance: &mut WorkflowInstance) -> WorkflowResult<()> {
		instance.bump();
		let mut attempt = 0;
		loop {
			match self.store.update_instance(instance).await {
				Ok(()) => return Ok(()),
				Err(err) if attempt < MAX_PERSIST_RETRIES => {
					attempt += 1;
					tracing::warn!(workflow_id=%instance.id, attempt, error=%err, "retrying instance persist");
					tokio::time::sleep(std::time::Duration::from_millis(50 * attempt as u64)).await;
				}
				Err(err) => return Err(WorkflowError::StoreTransient(err)),
			}
		}
	}
}

/// The common `start` contract shared by every task kind (design doc §4.A).
/// Boxed for the same reason as [`crate::cascade::on_complete`]: `start` and
/// `on_complete` call back into each other through the cascade.
pub fn start<'a>(
	engine: &'a Engine,
	instance: &'a mut WorkflowInstance,
	task_id: Id,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = WorkflowResult<()>> + Send + 'a>> {
	Box::pin(start_inner(engine, instance, task_id))
}

async fn start_inner(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id) -> WorkflowResult<()> {
	let Some(task) = instance.get_task(task_id) else {
		return Err(WorkflowError::MissingTask(task_id));
	};

	metrics::TASK_STARTED.with_label_values(&[task.kind.label()]).inc();

	// Step 1: idempotent replay for already-terminal success statuses.
	if matches!(task.status, TaskStatus::Completed | TaskStatus::Skipped) {
		let status = task.status;
		return crate::cascade::on_complete(engine, instance, task_id, status, true).await;
	}

	// Step 2: NOT_STARTED (or the SUBMITTED restart marker) -> EXECUTING.
	if matches!(task.status, TaskStatus::NotStarted | TaskStatus::Submitted) {
		let task = instance.get_task_mut(task_id).expect("checked above");
		task.status = TaskStatus::Executing;
		task.time_submitted = crate::utils::time::now();
		task.touch();
		engine.persist(instance).await?;
	}

	let kind = instance
		.get_task(task_id)
		.map(|t| t.kind.clone())
		.ok_or(WorkflowError::MissingTask(task_id))?;

	let outcome: WorkflowResult<Option<TaskStatus>> = match kind {
		TaskKind::Executor { .. } => crate::task::executor::execute(engine, instance, task_id).await.map(Some),
		TaskKind::Sensor { .. } => {
			crate::task::sensor::begin(engine, instance, task_id).await?;
			return Ok(());
		}
		TaskKind::Decision { .. } => {
			crate::task::decision::begin(engine, instance, task_id).await?;
			return Ok(());
		}
		TaskKind::Trigger { .. } => crate::task::trigger::execute(engine, instance, task_id).await,
		TaskKind::Interval { .. } => crate::task::trigger::execute_interval(engine, instance, task_id).await,
		TaskKind::Monitor { .. } => crate::task::trigger::execute_monitor(engine, instance, task_id).await,
		TaskKind::SystemTimer { .. } => {
			// Engine-internal; the driver invokes the trigger scheduler
			// directly rather than going through `start`.
			return Err(WorkflowError::UnsupportedOp {
				kind: "SystemTimer",
				op: "start",
			});
		}
		TaskKind::SubDag => {
			crate::task::subdag::begin(engine, instance, task_id).await?;
			return Ok(());
		}
		TaskKind::Root => {
			crate::task::subdag::begin_root(engine, instance, task_id).await?;
			return Ok(());
		}
		TaskKind::ParallelComposite { .. } => {
			crate::task::composite::begin(engine, instance, task_id).await?;
			return Ok(());
		}
	};

	// Step 3: a resolved status advances the cascade as usual. `ExecuteFailure`
	// (design doc §7) still drives the task to FAILURE before the error
	// reaches the caller; any other `Err` is an infrastructure failure (a
	// missing task, or the store refusing the write) that aborts without one.
	match outcome {
		Ok(Some(status)) => crate::cascade::on_complete(engine, instance, task_id, status, true).await,
		Ok(None) => Ok(()),
		Err(err @ WorkflowError::ExecuteFailure(..)) => {
			crate::cascade::on_complete(engine, instance, task_id, TaskStatus::Failure, true).await?;
			Err(err)
		}
		Err(err) => Err(err),
	}
}
