mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dagrunner::instance::WorkflowInstance;
use dagrunner::task::{Task, TaskKind, TaskStatus};

use common::{test_engine, TestHandlers};

/// End-to-end scenario 6: an interval task re-arms on every non-final
/// firing and finalizes once `interval_execute` reports completion.
#[tokio::test]
async fn interval_reschedules_until_finished() {
	let calls = Arc::new(AtomicU32::new(0));
	let calls_for_closure = calls.clone();

	let handlers = TestHandlers::new();
	handlers.on_interval("rearm", move |_now| calls_for_closure.fetch_add(1, Ordering::SeqCst) >= 2);
	let (engine, store) = test_engine(handlers);

	let mut instance = WorkflowInstance::new("interval", true);
	let root_id = instance.root_id;
	let now = dagrunner::utils::time::now();

	let mut interval = Task::new(TaskKind::Interval {
		time_to_execute: now,
		interval_execute_period: 5,
		time_to_force_complete: Some(now + 1_000),
		handler: "rearm".into(),
	});
	interval.parent_id = Some(root_id);
	let interval_id = interval.id;

	let mut after = Task::new(TaskKind::Executor {
		handler: "noop".into(),
		publish_stream: None,
	});
	after.parent_id = Some(root_id);
	let after_id = after.id;
	interval.next_dags = vec![after_id];

	instance.add_task(interval);
	instance.add_task(after);
	instance.get_task_mut(root_id).unwrap().root_dag = Some(interval_id);

	store.seed(instance.clone()).await;

	// First two firings: `interval_execute` reports "not yet", so the task
	// re-arms and the successor stays untouched.
	dagrunner::engine::start(&engine, &mut instance, root_id).await.unwrap();
	assert_eq!(instance.get_task(interval_id).unwrap().status, TaskStatus::Executing);
	assert_eq!(instance.get_task(after_id).unwrap().status, TaskStatus::NotStarted);
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	force_due(&mut instance, interval_id);
	dagrunner::engine::start(&engine, &mut instance, interval_id).await.unwrap();
	assert_eq!(instance.get_task(interval_id).unwrap().status, TaskStatus::Executing);
	assert_eq!(instance.get_task(after_id).unwrap().status, TaskStatus::NotStarted);
	assert_eq!(calls.load(Ordering::SeqCst), 2);

	// Third firing: `interval_execute` reports done, finalizing and
	// advancing the successor.
	force_due(&mut instance, interval_id);
	dagrunner::engine::start(&engine, &mut instance, interval_id).await.unwrap();
	assert_eq!(instance.get_task(interval_id).unwrap().status, TaskStatus::Completed);
	assert_eq!(instance.get_task(after_id).unwrap().status, TaskStatus::Completed);
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}

fn force_due(instance: &mut WorkflowInstance, interval_id: dagrunner::id::Id) {
	let now = dagrunner::utils::time::now();
	if let TaskKind::Interval { time_to_execute, .. } = &mut instance.get_task_mut(interval_id).unwrap().kind {
		*time_to_execute = now - 1;
	}
}
