mod common;

use dagrunner::instance::WorkflowInstance;
use dagrunner::store::Store;
use dagrunner::task::{Task, TaskKind};

use common::{test_engine, TestHandlers};

/// Invariant 5: a live sensor has exactly one correlation-index entry for
/// its current `(attr, value, stream)`, and none once terminal.
#[tokio::test]
async fn correlation_index_tracks_sensor_lifecycle() {
	let handlers = TestHandlers::new();
	let (engine, store) = test_engine(handlers);

	let mut instance = WorkflowInstance::new("correlation", true);
	let root_id = instance.root_id;

	let mut s = Task::new(TaskKind::Sensor {
		stream: "topic".into(),
		match_only_one: false,
	});
	s.parent_id = Some(root_id);
	s.correlatable_key = Some("attr".to_string());
	let s_id = s.id;

	instance.runtime_parameters.insert("attr".to_string(), serde_json::json!("v1"));
	instance.add_task(s);
	instance.get_task_mut(root_id).unwrap().root_dag = Some(s_id);

	store.seed(instance.clone()).await;
	dagrunner::engine::start(&engine, &mut instance, root_id).await.unwrap();

	let key_v1 = ("attr".to_string(), format!("{}_topic", serde_json::json!("v1")));
	let hits = engine.store.get_tasks_by_correlatable_key(&key_v1, true).await.unwrap();
	assert_eq!(hits, vec![(root_id, s_id)]);

	// The blackboard value drifts; refreshing should move the index entry.
	instance.runtime_parameters.insert("attr".to_string(), serde_json::json!("v2"));
	dagrunner::correlation::refresh_sensors(&engine, &mut instance).await.unwrap();

	let hits_v1_after = engine.store.get_tasks_by_correlatable_key(&key_v1, true).await.unwrap();
	assert!(hits_v1_after.is_empty());

	let key_v2 = ("attr".to_string(), format!("{}_topic", serde_json::json!("v2")));
	let hits_v2 = engine.store.get_tasks_by_correlatable_key(&key_v2, true).await.unwrap();
	assert_eq!(hits_v2, vec![(root_id, s_id)]);
}
