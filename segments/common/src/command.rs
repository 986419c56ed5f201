//! Messages carried by the command channel.
//!
//! Every message is a JSON object tagged by `kind`. Decoding is lenient about
//! the shapes older producers emit; encoding always writes the canonical form.

use chrono::{DateTime, Utc};

use crate::database::UserId;
use crate::time::{self, TimeError};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
	RevokeSegments(RevokeSegments),
	ExportStats(ExportStats),
	/// A kind this build does not know about. Consumers ignore it.
	#[serde(other)]
	Unknown,
}

impl Command {
	pub fn decode(payload: &[u8]) -> Result<Self, CommandError> {
		Ok(serde_json::from_slice(payload)?)
	}

	pub fn encode(&self) -> Result<Vec<u8>, CommandError> {
		Ok(serde_json::to_vec(self)?)
	}

	pub const fn kind(&self) -> &'static str {
		match self {
			Self::RevokeSegments(_) => "revoke_segments",
			Self::ExportStats(_) => "export_stats",
			Self::Unknown => "unknown",
		}
	}
}

/// Remove `segments` from every user in `users` once `fire_at` has passed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RevokeSegmentsWire")]
pub struct RevokeSegments {
	pub users: Vec<UserId>,
	pub segments: Vec<String>,
	pub fire_at: DateTime<Utc>,
}

#[derive(serde::Deserialize)]
struct RevokeSegmentsWire {
	#[serde(default)]
	user: Option<UserId>,
	#[serde(default)]
	users: Vec<UserId>,
	segments: Vec<String>,
	#[serde(alias = "time")]
	fire_at: String,
}

impl TryFrom<RevokeSegmentsWire> for RevokeSegments {
	type Error = CommandError;

	fn try_from(wire: RevokeSegmentsWire) -> Result<Self, Self::Error> {
		let mut users = wire.users;
		if let Some(user) = wire.user {
			if !users.contains(&user) {
				users.insert(0, user);
			}
		}

		if users.is_empty() {
			return Err(CommandError::NoUsers);
		}

		if wire.segments.is_empty() {
			return Err(CommandError::NoSegments);
		}

		Ok(Self {
			users,
			segments: wire.segments,
			fire_at: time::parse_timestamp(&wire.fire_at)?,
		})
	}
}

/// Write the audit events of one calendar month to `file_name`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExportStats {
	pub year: i32,
	pub month: u32,
	pub file_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
	#[error("malformed command: {0}")]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Time(#[from] TimeError),
	#[error("revoke command names no users")]
	NoUsers,
	#[error("revoke command names no segments")]
	NoSegments,
}
