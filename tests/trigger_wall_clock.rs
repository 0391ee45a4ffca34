mod common;

use dagrunner::instance::WorkflowInstance;
use dagrunner::task::{Task, TaskKind, TaskStatus};

use common::{test_engine, TestHandlers};

/// One-shot `Trigger`: re-arms (stays EXECUTING, successor untouched) until
/// its deadline passes, then behaves like an executor and advances.
#[tokio::test]
async fn trigger_waits_then_fires_past_deadline() {
	let handlers = TestHandlers::new();
	handlers.on_execute("fire", || Ok(serde_json::json!({"fired": true})));
	let (engine, store) = test_engine(handlers);

	let mut instance = WorkflowInstance::new("trigger", true);
	let root_id = instance.root_id;
	let now = dagrunner::utils::time::now();

	let mut trigger = Task::new(TaskKind::Trigger {
		time_to_execute: now + 60_000,
		handler: "fire".into(),
	});
	trigger.parent_id = Some(root_id);
	let trigger_id = trigger.id;

	let mut after = Task::new(TaskKind::Executor {
		handler: "noop".into(),
		publish_stream: None,
	});
	after.parent_id = Some(root_id);
	let after_id = after.id;
	trigger.next_dags = vec![after_id];

	instance.add_task(trigger);
	instance.add_task(after);
	instance.get_task_mut(root_id).unwrap().root_dag = Some(trigger_id);

	store.seed(instance.clone()).await;

	// Deadline is an hour out: the trigger arms itself and nothing advances.
	dagrunner::engine::start(&engine, &mut instance, root_id).await.unwrap();
	assert_eq!(instance.get_task(trigger_id).unwrap().status, TaskStatus::Executing);
	assert_eq!(instance.get_task(after_id).unwrap().status, TaskStatus::NotStarted);

	// Scheduler finds the deadline past and fires it directly.
	if let TaskKind::Trigger { time_to_execute, .. } = &mut instance.get_task_mut(trigger_id).unwrap().kind {
		*time_to_execute = now - 1;
	}
	dagrunner::engine::start(&engine, &mut instance, trigger_id).await.unwrap();

	let trigger_task = instance.get_task(trigger_id).unwrap();
	assert_eq!(trigger_task.status, TaskStatus::Completed);
	assert_eq!(
		trigger_task.output.as_ref().and_then(|o| o.get("fired")).and_then(|v| v.as_bool()),
		Some(true)
	);
	assert_eq!(instance.get_task(after_id).unwrap().status, TaskStatus::Completed);
}
