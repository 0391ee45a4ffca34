mod common;

use dagrunner::instance::WorkflowInstance;
use dagrunner::store::Store;
use dagrunner::task::{Task, TaskKind, TaskStatus};

use common::{test_engine, TestHandlers};

/// End-to-end scenario 3: `A(executor) -> S(sensor, allow_skip_to) -> B`,
/// with `A` still NOT_STARTED when the first matching event arrives.
#[tokio::test]
async fn allow_skip_to_skips_pending_predecessor_then_delivers() {
	let handlers = TestHandlers::new();
	let (engine, store) = test_engine(handlers);

	let mut instance = WorkflowInstance::new("sensor-skip", false);
	let root_id = instance.root_id;
	let stream = "sensor-stream";

	let mut a = Task::new(TaskKind::Executor {
		handler: "noop".into(),
		publish_stream: None,
	});
	a.parent_id = Some(root_id);
	let a_id = a.id;

	let mut s = Task::new(TaskKind::Sensor {
		stream: stream.to_string(),
		match_only_one: false,
	});
	s.parent_id = Some(root_id);
	s.correlatable_key = Some("attr1".to_string());
	s.allow_skip_to = true;
	let s_id = s.id;

	let mut b = Task::new(TaskKind::Executor {
		handler: "noop".into(),
		publish_stream: None,
	});
	b.parent_id = Some(root_id);
	let b_id = b.id;

	a.next_dags = vec![s_id];
	s.next_dags = vec![b_id];

	instance.add_task(a);
	instance.add_task(s);
	instance.add_task(b);
	instance.get_task_mut(root_id).unwrap().root_dag = Some(a_id);

	// Simulate the sensor's correlatable key having been registered ahead of
	// time (e.g. by the out-of-scope template instantiator), since it is
	// never actually started here.
	let value = serde_json::json!("go").to_string();
	let key = ("attr1".to_string(), format!("{value}_{stream}"));
	engine
		.store
		.update_correlatable_key_for_task(instance.id, s_id, None, Some(key))
		.await
		.unwrap();
	store.seed(instance.clone()).await;

	assert_eq!(instance.get_task(a_id).unwrap().status, TaskStatus::NotStarted);

	// First event: arms the sensor, delivers but does not yet satisfy it.
	let event1 = serde_json::json!({"key": "attr1", "value": "go", "satisfied": false});
	dagrunner::correlation::dispatch_event(&engine, stream, event1).await.unwrap();

	let mut instance = store.get_instance(root_id).await.unwrap().unwrap();
	assert_eq!(instance.get_task(a_id).unwrap().status, TaskStatus::Skipped);
	assert_eq!(instance.get_task(s_id).unwrap().status, TaskStatus::Executing);
	assert_eq!(instance.get_task(b_id).unwrap().status, TaskStatus::NotStarted);

	// Second event: satisfies the sensor, cascades into B.
	let event2 = serde_json::json!({"key": "attr1", "value": "go", "satisfied": true});
	dagrunner::correlation::dispatch_event(&engine, stream, event2).await.unwrap();

	instance = store.get_instance(root_id).await.unwrap().unwrap();
	assert_eq!(instance.get_task(s_id).unwrap().status, TaskStatus::Completed);
	assert_eq!(instance.get_task(b_id).unwrap().status, TaskStatus::Completed);
}
