use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::command::ExportStats;
use common::database::MembershipEvent;
use segments_api::error::StoreError;
use segments_api::store::MembershipStore;

pub const HEADER: [&str; 4] = ["user", "segment", "operation", "timestamp"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
	#[error("failed to load events: {0}")]
	Store(#[from] StoreError),
	#[error("failed to encode csv: {0}")]
	Csv(#[from] csv::Error),
	#[error("failed to write export: {0}")]
	Io(#[from] std::io::Error),
	#[error("refusing to write export to {0:?}")]
	InvalidFileName(String),
}

/// Writes the audit events of one month to a CSV file.
pub struct Exporter<S> {
	store: Arc<S>,
	dir: PathBuf,
}

impl<S: MembershipStore> Exporter<S> {
	pub fn new(store: Arc<S>, dir: impl Into<PathBuf>) -> Self {
		Self { store, dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Returns the path of the written file. The file is replaced as a whole,
	/// readers never see a partial export.
	pub async fn export(&self, request: &ExportStats) -> Result<PathBuf, ExportError> {
		let path = self.target(&request.file_name)?;

		let events = self.store.stats_for_period(request.year, request.month).await?;
		let contents = encode(&events)?;

		tokio::fs::create_dir_all(&self.dir).await?;

		let partial = path.with_extension("csv.partial");
		tokio::fs::write(&partial, contents).await?;
		tokio::fs::rename(&partial, &path).await?;

		tracing::info!(
			year = request.year,
			month = request.month,
			rows = events.len(),
			path = %path.display(),
			"exported stats"
		);

		Ok(path)
	}

	fn target(&self, file_name: &str) -> Result<PathBuf, ExportError> {
		// Names arrive over the command channel and must stay inside `dir`.
		let plain = Path::new(file_name)
			.file_name()
			.is_some_and(|name| name == file_name);

		if !plain {
			return Err(ExportError::InvalidFileName(file_name.to_owned()));
		}

		Ok(self.dir.join(file_name))
	}
}

/// Renders events as CSV with a header row. Timestamps are local wall clock
/// time.
pub fn encode(events: &[MembershipEvent]) -> Result<Vec<u8>, ExportError> {
	let mut writer = csv::Writer::from_writer(Vec::new());
	writer.write_record(HEADER)?;

	for event in events {
		writer.write_record([
			event.user_id.to_string().as_str(),
			event.segment_slug.as_str(),
			event.operation.as_str(),
			common::time::format_local(event.created_at).as_str(),
		])?;
	}

	writer.into_inner().map_err(|err| ExportError::Io(err.into_error()))
}
