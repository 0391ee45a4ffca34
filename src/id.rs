use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Universally-unique identifier used for tasks, workflow instances, and
/// triggers. Stable for the lifetime of the entity it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
	/// Generates a new, time-ordered id.
	pub fn new() -> Self {
		Id(Uuid::now_v7())
	}

	pub fn nil() -> Self {
		Id(Uuid::nil())
	}

	pub fn as_uuid(&self) -> Uuid {
		self.0
	}
}

impl Default for Id {
	fn default() -> Self {
		Id::new()
	}
}

impl From<Uuid> for Id {
	fn from(u: Uuid) -> Self {
		Id(u)
	}
}

impl fmt::Display for Id {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for Id {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Id(Uuid::parse_str(s)?))
	}
}
