//! ExecutorTask / KafkaCommandTask (design doc §4.A).

use crate::engine::Engine;
use crate::error::{WorkflowError, WorkflowResult};
use crate::id::Id;
use crate::instance::WorkflowInstance;
use crate::task::{TaskKind, TaskStatus};

/// Runs the registered handler and, for a `publish_stream` executor (the
/// `KafkaCommandTask` equivalent), publishes its output before returning.
/// A business-logic (or publish) failure surfaces as
/// `Err(WorkflowError::ExecuteFailure)` (design doc §7); the caller — the
/// common `start` contract — still drives the task to `FAILURE` before
/// propagating that error onward.
pub async fn execute(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id) -> WorkflowResult<TaskStatus> {
	let TaskKind::Executor { handler, publish_stream } = instance
		.get_task(task_id)
		.ok_or(WorkflowError::MissingTask(task_id))?
		.kind
		.clone()
	else {
		return Err(WorkflowError::UnsupportedOp {
			kind: "non-executor",
			op: "execute",
		});
	};

	match engine.handlers.execute(&handler, &instance.runtime_parameters).await {
		Ok(output) => {
			if let Some(stream) = &publish_stream {
				if let Err(err) = engine.broker.publish(stream, output.clone()).await {
					tracing::error!(%task_id, stream, error=%err, "executor publish failed");
					if let Some(task) = instance.get_task_mut(task_id) {
						task.output = Some(serde_json::json!({"error": err.to_string()}));
					}
					return Err(WorkflowError::ExecuteFailure(task_id, err));
				}
			}
			if let Some(task) = instance.get_task_mut(task_id) {
				task.output = Some(output);
			}
			Ok(TaskStatus::Completed)
		}
		Err(err) => {
			tracing::warn!(%task_id, %handler, error=%err, "executor handler failed");
			if let Some(task) = instance.get_task_mut(task_id) {
				task.output = Some(serde_json::json!({"error": err.to_string()}));
			}
			Err(WorkflowError::ExecuteFailure(task_id, err))
		}
	}
}
