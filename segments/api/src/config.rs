#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
	/// The JetStream stream that stores pending commands
	pub stream: String,

	/// The subject commands are published on
	pub subject: String,

	/// The durable consumer the worker pulls from
	pub consumer: String,
}

impl Default for CommandsConfig {
	fn default() -> Self {
		Self {
			stream: "segments-commands".to_string(),
			subject: "segments.commands".to_string(),
			consumer: "segments-worker".to_string(),
		}
	}
}
