use std::path::PathBuf;

pub use segments_api::config::CommandsConfig;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportConfig {
	/// Directory the monthly CSV exports are written to
	pub dir: PathBuf,
}

impl Default for ExportConfig {
	fn default() -> Self {
		Self {
			dir: PathBuf::from("exports"),
		}
	}
}
