//! SensorTask / KafkaListenerTask (design doc §4.A, §4.E).
//!
//! `start` only arms the sensor; completion is driven exclusively by a
//! later `on_message` through [`crate::correlation::dispatch_event`].

use crate::engine::Engine;
use crate::error::WorkflowResult;
use crate::id::Id;
use crate::instance::WorkflowInstance;

pub async fn begin(engine: &Engine, instance: &mut WorkflowInstance, task_id: Id) -> WorkflowResult<()> {
	crate::correlation::register_sensor(engine, instance, task_id).await?;
	engine.persist(instance).await
}
