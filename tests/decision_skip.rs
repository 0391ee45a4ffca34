mod common;

use dagrunner::instance::WorkflowInstance;
use dagrunner::task::{Task, TaskKind, TaskStatus};

use common::{test_engine, TestHandlers};

/// End-to-end scenario 2: decision task picks Y, X is skipped.
#[tokio::test]
async fn decision_skips_unchosen_branch() {
	let mut instance = WorkflowInstance::new("decision", true);
	let root_id = instance.root_id;

	let mut x = Task::new(TaskKind::Executor {
		handler: "noop".into(),
		publish_stream: None,
	});
	x.parent_id = Some(root_id);
	let x_id = x.id;

	let mut y = Task::new(TaskKind::Executor {
		handler: "noop".into(),
		publish_stream: None,
	});
	y.parent_id = Some(root_id);
	let y_id = y.id;

	let mut d = Task::new(TaskKind::Decision { handler: "pick_y".into() });
	d.parent_id = Some(root_id);
	d.next_dags = vec![x_id, y_id];
	let d_id = d.id;

	let handlers = TestHandlers::new();
	handlers.on_evaluate("pick_y", move |candidates| candidates.iter().copied().find(|&id| id == y_id));
	let (engine, store) = test_engine(handlers);

	instance.add_task(x);
	instance.add_task(y);
	instance.add_task(d);
	instance.get_task_mut(root_id).unwrap().root_dag = Some(d_id);

	store.seed(instance.clone()).await;
	dagrunner::engine::start(&engine, &mut instance, root_id).await.unwrap();

	assert_eq!(instance.get_task(x_id).unwrap().status, TaskStatus::Skipped);
	assert_eq!(instance.get_task(y_id).unwrap().status, TaskStatus::Completed);
	assert_eq!(instance.get_task(d_id).unwrap().status, TaskStatus::Completed);
}
