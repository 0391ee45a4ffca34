mod common;

use dagrunner::instance::WorkflowInstance;
use dagrunner::task::{MonitorPolicy, Task, TaskKind, TaskStatus};

use common::{test_engine, TestHandlers};

/// End-to-end scenario 5: a monitor fires while the monitored task is still
/// EXECUTING, skipping it (and its still-pending prefix) and advancing its
/// successor.
#[tokio::test]
async fn monitor_skips_still_running_task_on_deadline() {
	let handlers = TestHandlers::new();
	handlers.on_execute("noop", || Ok(serde_json::json!(null)));
	let (engine, store) = test_engine(handlers);

	let mut instance = WorkflowInstance::new("monitor", true);
	let root_id = instance.root_id;

	// A sensor never self-completes in this test; it stands in for a task
	// that is still EXECUTING when the monitor's deadline fires.
	let mut p = Task::new(TaskKind::Sensor {
		stream: "never".into(),
		match_only_one: false,
	});
	p.parent_id = Some(root_id);
	let p_id = p.id;

	let mut q = Task::new(TaskKind::Executor {
		handler: "noop".into(),
		publish_stream: None,
	});
	q.parent_id = Some(root_id);
	let q_id = q.id;
	p.next_dags = vec![q_id];

	let now = dagrunner::utils::time::now();
	let monitor = Task::new(TaskKind::Monitor {
		time_to_execute: now - 100,
		monitored_task_id: p_id,
		policy: MonitorPolicy::SkipOnMaxDuration,
	});
	let monitor_id = monitor.id;

	instance.add_task(p);
	instance.add_task(q);
	instance.add_task(monitor);
	instance.get_task_mut(root_id).unwrap().root_dag = Some(p_id);

	store.seed(instance.clone()).await;

	// P starts and parks in EXECUTING (sensor semantics).
	dagrunner::engine::start(&engine, &mut instance, root_id).await.unwrap();
	assert_eq!(instance.get_task(p_id).unwrap().status, TaskStatus::Executing);

	// The scheduler would find this monitor already past its deadline; fire
	// it directly.
	dagrunner::engine::start(&engine, &mut instance, monitor_id).await.unwrap();

	assert_eq!(instance.get_task(p_id).unwrap().status, TaskStatus::Skipped);
	assert_eq!(instance.get_task(q_id).unwrap().status, TaskStatus::Completed);
	assert_eq!(instance.get_task(monitor_id).unwrap().status, TaskStatus::Completed);
}
