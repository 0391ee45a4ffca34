use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine-wide tunables. Loaded from an optional TOML file plus
/// `DAGRUNNER_`-prefixed environment overrides (e.g.
/// `DAGRUNNER_TICK_INTERVAL_MS=500`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// How often the system timer checks the trigger index for ready triggers.
	pub tick_interval_ms: u64,
	/// Whether a root instance is deleted from the store once every task is terminal.
	pub delete_on_complete: bool,
	/// Soft cap on entries per correlation-index bucket before the store is expected
	/// to chain an overflow bucket. Opaque to the core; informational only.
	pub correlation_bucket_size: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		EngineConfig {
			tick_interval_ms: 1_000,
			delete_on_complete: true,
			correlation_bucket_size: 256,
		}
	}
}

impl EngineConfig {
	pub fn tick_interval(&self) -> Duration {
		Duration::from_millis(self.tick_interval_ms)
	}

	/// Loads configuration from `path` (if it exists) layered under defaults,
	/// then applies `DAGRUNNER_*` environment overrides.
	pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
		let mut builder = config::Config::builder()
			.add_source(config::Config::try_from(&EngineConfig::default())?);

		if let Some(path) = path {
			builder = builder.add_source(config::File::with_name(path).required(false));
		}

		builder = builder.add_source(config::Environment::with_prefix("DAGRUNNER"));

		let cfg = builder.build()?;
		Ok(cfg.try_deserialize()?)
	}
}
