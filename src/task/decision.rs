//! DecisionTask (design doc §4.A). `execute` is disallowed; `start` picks
//! exactly one successor via the registered handler and skips the rest,
//! then lets the normal cascade advance the survivor.

use crate::engine::Engine;
use crate::error::WorkflowResult;
use crate::id::Id;
use crate::instance::WorkflowInstance;
use crate::task::{TaskKind, TaskStatus};

pub async fn begin(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id) -> WorkflowResult<()> {
	let Some(task) = instance.get_task(task_id) else {
		return Err(crate::error::WorkflowError::MissingTask(task_id));
	};
	let TaskKind::Decision { handler } = task.kind.clone() else {
		return Err(crate::error::WorkflowError::UnsupportedOp {
			kind: "non-decision",
			op: "evaluate",
		});
	};
	let candidates = task.next_dags.clone();

	let chosen = engine
		.handlers
		.evaluate(&handler, &instance.runtime_parameters, &candidates)
		.await;

	for &next_id in &candidates {
		if Some(next_id) != chosen {
			crate::cascade::on_complete(engine, instance, next_id, TaskStatus::Skipped, false).await?;
		}
	}

	crate::cascade::on_complete(engine, instance, task_id, TaskStatus::Completed, true).await
}
