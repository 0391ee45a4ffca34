//! The task-kind hierarchy and state machine (component A of the design).
//!
//! `Task` is plain data; behavior lives in the kind-specific modules below
//! and is dispatched by [`crate::engine::Engine`] on [`Task::kind`]. There is
//! no dynamic-dispatch class hierarchy: the engine matches on the kind tag.

pub mod composite;
pub mod decision;
pub mod executor;
pub mod sensor;
pub mod subdag;
pub mod trigger;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::id::Id;

/// One of the four coarse shapes a task can take in the DAG. Derived from
/// [`TaskKind`] rather than stored redundantly, so the two can never drift
/// apart (the Python original stores this independently; keeping it
/// computed removes an invariant the Rust port does not need).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
	Root,
	SubDag,
	Leaf,
	ParallelComposite,
}

/// Lifecycle status of a task. See the state machine diagram in the design
/// doc §4.A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
	NotStarted,
	Submitted,
	Executing,
	Completed,
	Failure,
	Skipped,
	Stopped,
}

impl TaskStatus {
	/// Terminal set T = {COMPLETED, SKIPPED, FAILURE, STOPPED}.
	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			TaskStatus::Completed | TaskStatus::Skipped | TaskStatus::Failure | TaskStatus::Stopped
		)
	}
}

/// `JOIN_ALL` completes once every child is terminal; `ATLEAST_ONE` completes
/// as soon as one child is terminal and ignores the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinOperator {
	JoinAll,
	AtLeastOne,
}

/// Which monitoring policy a `Monitor` trigger applies when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorPolicy {
	/// The only concrete monitor shipped by the core: skip the monitored
	/// task (and its still-pending prefix) if it's still EXECUTING when
	/// the deadline fires.
	SkipOnMaxDuration,
}

/// Kind-specific data. `handler` fields name a callback registered with the
/// engine's [`crate::engine::Handlers`] implementation; tasks stay plain,
/// serializable data even though their behavior is user-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskKind {
	/// Leaf task whose `execute` runs user business logic. `publish_stream`,
	/// when set, makes this a `KafkaCommandTask`: after a successful
	/// `execute` the engine publishes the task's output to that stream via
	/// [`crate::broker::Broker::publish`].
	Executor {
		handler: String,
		publish_stream: Option<String>,
	},
	/// Leaf task driven by inbound messages on `stream`. `match_only_one`,
	/// when set, makes this sensor self-complete after consuming exactly one
	/// correlated event across all live instances.
	Sensor { stream: String, match_only_one: bool },
	/// Leaf task whose `start` picks exactly one successor via `evaluate`
	/// and marks the rest SKIPPED.
	Decision { handler: String },
	/// One-shot wall-clock gate. No-op until `time_to_execute`, then behaves
	/// like an executor with `handler`.
	Trigger {
		time_to_execute: i64,
		handler: String,
	},
	/// Trigger that re-arms itself on `interval_execute_period` until either
	/// `handler` reports completion or `time_to_force_complete` passes.
	Interval {
		time_to_execute: i64,
		interval_execute_period: i64,
		time_to_force_complete: Option<i64>,
		handler: String,
	},
	/// Trigger that inspects `monitored_task_id` on firing and applies
	/// `policy`.
	Monitor {
		time_to_execute: i64,
		monitored_task_id: Id,
		policy: MonitorPolicy,
	},
	/// Engine-internal, periodic. Not part of any user DAG; advances the
	/// trigger index and emits no completion cascade of its own.
	SystemTimer { time_to_execute: i64 },
	/// Non-leaf task whose body is the DAG rooted at `Task::root_dag`.
	SubDag,
	/// The workflow instance itself.
	Root,
	/// Fan-out/fan-in over `children`, joined per `operator`.
	ParallelComposite {
		children: BTreeSet<Id>,
		operator: JoinOperator,
	},
}

impl TaskKind {
	pub fn task_type(&self) -> TaskType {
		match self {
			TaskKind::Root => TaskType::Root,
			TaskKind::SubDag => TaskType::SubDag,
			TaskKind::ParallelComposite { .. } => TaskType::ParallelComposite,
			_ => TaskType::Leaf,
		}
	}

	/// A short, stable label used in metrics and log fields.
	pub fn label(&self) -> &'static str {
		match self {
			TaskKind::Executor { .. } => "executor",
			TaskKind::Sensor { .. } => "sensor",
			TaskKind::Decision { .. } => "decision",
			TaskKind::Trigger { .. } => "trigger",
			TaskKind::Interval { .. } => "interval",
			TaskKind::Monitor { .. } => "monitor",
			TaskKind::SystemTimer { .. } => "system_timer",
			TaskKind::SubDag => "sub_dag",
			TaskKind::Root => "root",
			TaskKind::ParallelComposite { .. } => "parallel_composite",
		}
	}
}

/// The common record every task kind specializes (design doc §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
	pub id: Id,
	pub parent_id: Option<Id>,
	pub root_dag: Option<Id>,
	pub next_dags: Vec<Id>,
	pub status: TaskStatus,
	pub time_created: i64,
	pub time_submitted: i64,
	pub time_completed: i64,
	pub lastupdated: i64,
	/// Name of the runtime-parameter attribute a sensor task watches.
	pub correlatable_key: Option<String>,
	pub allow_skip_to: bool,
	pub reprocess_on_message: bool,
	pub kind: TaskKind,
	pub output: Option<serde_json::Value>,
	/// The companion `SkipOnMaxDuration` monitor spawned for this task by
	/// [`crate::task::subdag::begin_root`], if any. `None` means either no
	/// deadline was configured or one hasn't been set up yet.
	pub monitoring_task_id: Option<Id>,
}

impl Task {
	pub fn new(kind: TaskKind) -> Self {
		let now = crate::utils::time::now();
		Task {
			id: Id::new(),
			parent_id: None,
			root_dag: None,
			next_dags: Vec::new(),
			status: TaskStatus::NotStarted,
			time_created: now,
			time_submitted: 0,
			time_completed: 0,
			lastupdated: now,
			correlatable_key: None,
			allow_skip_to: false,
			reprocess_on_message: false,
			kind,
			output: None,
			monitoring_task_id: None,
		}
	}

	pub fn task_type(&self) -> TaskType {
		self.kind.task_type()
	}

	pub fn is_terminal(&self) -> bool {
		self.status.is_terminal()
	}

	pub fn touch(&mut self) {
		self.lastupdated = crate::utils::time::now();
	}
}
