use thiserror::Error;

use crate::id::Id;

/// Error taxonomy for the engine (see §7 of the design doc).
///
/// `MissingTask` and `DeliverySkipped` are logged and swallowed at the call
/// site; they are only ever returned from helpers that the caller chooses
/// to surface for testing. `UnsupportedOp` and `ExecuteFailure` propagate.
#[derive(Debug, Error)]
pub enum WorkflowError {
	#[error("referenced task {0} does not exist in this workflow instance")]
	MissingTask(Id),

	#[error("{kind} does not support {op}")]
	UnsupportedOp {
		kind: &'static str,
		op: &'static str,
	},

	#[error("task {0} execute failed: {1}")]
	ExecuteFailure(Id, #[source] anyhow::Error),

	#[error("store operation failed: {0}")]
	StoreTransient(#[source] anyhow::Error),

	#[error("dispatch skipped: {0}")]
	DeliverySkipped(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
