//! Event ingress and timer driver (design doc §5). Mirrors the teacher's
//! `Worker`: one background task per subscribed stream plus a ticking
//! trigger-scheduler task, all cancelled cooperatively through a shared
//! `watch` stop channel on shutdown.

use std::time::Duration;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::engine::Engine;

const SHUTDOWN_PROGRESS_INTERVAL: Duration = Duration::from_secs(7);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Spawns the driver's background tasks and returns a handle to stop them.
/// `streams` lists every stream a sensor somewhere might be listening on;
/// the driver subscribes to each and routes inbound events through
/// [`crate::correlation::dispatch_event`].
pub fn spawn(engine: Engine, streams: Vec<String>) -> DriverHandle {
	let (stop_tx, stop_rx) = watch::channel(());
	let mut tasks = Vec::with_capacity(streams.len() + 1);

	for stream in streams {
		tasks.push(spawn_listener(engine.clone(), stream, stop_rx.clone()));
	}
	tasks.push(spawn_ticker(engine, stop_rx));

	DriverHandle { stop: stop_tx, tasks }
}

fn spawn_listener(engine: Engine, stream: String, mut stop_rx: watch::Receiver<()>) -> JoinHandle<()> {
	let span = tracing::info_span!("dagrunner_listener", stream = %stream);
	tokio::spawn(
		async move {
			let mut rx = match engine.broker.subscribe(&stream).await {
				Ok(rx) => rx,
				Err(err) => {
					tracing::error!(error=%err, "failed to subscribe, listener exiting");
					return;
				}
			};

			loop {
				tokio::select! {
					event = rx.recv() => {
						let Some(event) = event else {
							tracing::warn!("broker channel closed, listener exiting");
							break;
						};
						if let Err(err) = crate::correlation::dispatch_event(&engine, &event.stream, event.payload).await {
							tracing::error!(error=%err, "event dispatch failed");
						}
					}
					_ = stop_rx.changed() => break,
				}
			}
		}
		.instrument(span),
	)
}

fn spawn_ticker(engine: Engine, mut stop_rx: watch::Receiver<()>) -> JoinHandle<()> {
	tokio::spawn(
		async move {
			let mut interval = tokio::time::interval(engine.config.tick_interval());
			interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

			loop {
				tokio::select! {
					_ = interval.tick() => {
						match crate::trigger_scheduler::tick(&engine).await {
							Ok(fired) if fired > 0 => tracing::debug!(fired, "trigger scheduler tick"),
							Ok(_) => {}
							Err(err) => tracing::error!(error=%err, "trigger scheduler tick failed"),
						}
					}
					_ = stop_rx.changed() => break,
				}
			}
		}
		.instrument(tracing::info_span!("dagrunner_ticker")),
	)
}

/// Handle returned by [`spawn`]. Dropping it leaves the background tasks
/// running; call [`DriverHandle::shutdown`] to stop them cooperatively.
pub struct DriverHandle {
	stop: watch::Sender<()>,
	tasks: Vec<JoinHandle<()>>,
}

impl DriverHandle {
	/// Signals every background task to stop and waits for them to exit,
	/// up to `timeout` (default 30s).
	pub async fn shutdown(mut self, timeout: Option<Duration>) {
		let _ = self.stop.send(());

		let mut pending = self.tasks.iter_mut().collect::<FuturesUnordered<_>>();
		let mut progress = tokio::time::interval(SHUTDOWN_PROGRESS_INTERVAL);
		progress.tick().await;

		let deadline = tokio::time::sleep(timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT));
		tokio::pin!(deadline);

		loop {
			tokio::select! {
				next = pending.next() => {
					if next.is_none() {
						break;
					}
				}
				_ = progress.tick() => {
					tracing::info!(remaining = pending.len(), "driver still shutting down");
				}
				_ = &mut deadline => {
					tracing::warn!("driver shutdown timed out, abandoning remaining tasks");
					break;
				}
			}
		}
	}
}
