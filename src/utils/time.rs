use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as epoch seconds.
pub fn now() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock before unix epoch")
		.as_secs() as i64
}
