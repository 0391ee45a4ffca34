use lazy_static::lazy_static;
use prometheus::{HistogramVec, IntCounterVec, register_histogram_vec, register_int_counter_vec};

lazy_static! {
	pub static ref TASK_STARTED: IntCounterVec = register_int_counter_vec!(
		"dagrunner_task_started_total",
		"Number of times a task's start() was invoked.",
		&["kind"]
	)
	.unwrap();
	pub static ref TASK_COMPLETED: IntCounterVec = register_int_counter_vec!(
		"dagrunner_task_completed_total",
		"Number of times a task reached a terminal status.",
		&["kind", "status"]
	)
	.unwrap();
	pub static ref CASCADE_DURATION: HistogramVec = register_histogram_vec!(
		"dagrunner_cascade_duration_seconds",
		"Time spent in a single on_complete cascade step.",
		&["workflow_name"]
	)
	.unwrap();
	pub static ref DISPATCH_EVENTS: IntCounterVec = register_int_counter_vec!(
		"dagrunner_dispatch_events_total",
		"Inbound events resolved through the correlation index, by outcome.",
		&["stream", "outcome"]
	)
	.unwrap();
	pub static ref TRIGGERS_FIRED: IntCounterVec = register_int_counter_vec!(
		"dagrunner_triggers_fired_total",
		"Triggers that fired on a scheduler tick.",
		&["kind"]
	)
	.unwrap();
}
