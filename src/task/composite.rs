//! ParallelCompositeTask (design doc §4.A, §4.G).

use crate::engine::Engine;
use crate::error::WorkflowResult;
use crate::id::Id;
use crate::instance::WorkflowInstance;
use crate::task::{TaskKind, TaskStatus};

/// Starts every child in iteration order. Children run independently;
/// completion of the composite itself is driven by [`notify`].
pub async fn begin(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id) -> WorkflowResult<()> {
	let Some(task) = instance.get_task(task_id) else {
		return Err(crate::error::WorkflowError::MissingTask(task_id));
	};
	let TaskKind::ParallelComposite { children, .. } = task.kind.clone() else {
		return Err(crate::error::WorkflowError::UnsupportedOp {
			kind: "non-composite",
			op: "start",
		});
	};

	engine.persist(instance).await?;

	for child_id in children {
		tokio::task::yield_now().await;
		crate::engine::start(engine, instance, child_id).await?;
	}

	Ok(())
}

/// Applies join semantics on every child terminal transition. The incoming
/// `status` is the status propagated onward when the join is satisfied.
pub async fn notify(
	engine: &Engine,
	instance: &mut WorkflowInstance,
	parent_id: Id,
	status: TaskStatus,
) -> WorkflowResult<()> {
	let Some(task) = instance.get_task(parent_id) else {
		return Err(crate::error::WorkflowError::MissingTask(parent_id));
	};
	let TaskKind::ParallelComposite { children, operator } = task.kind.clone() else {
		return Err(crate::error::WorkflowError::UnsupportedOp {
			kind: "non-composite",
			op: "notify",
		});
	};

	// A parent already terminal (ATLEAST_ONE settled by an earlier child)
	// has nothing left to decide; later siblings still ran to their own
	// terminal state, their notifications just no longer matter.
	if task.is_terminal() {
		return Ok(());
	}

	let statuses: Vec<TaskStatus> = children
		.iter()
		.filter_map(|id| instance.get_task(*id).map(|t| t.status))
		.collect();

	if crate::cascade::join_satisfied(operator, &statuses) {
		crate::cascade::on_complete(engine, instance, parent_id, status, true).await
	} else {
		engine.persist(instance).await
	}
}
