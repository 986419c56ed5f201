use postgres_types::{FromSql, ToSql};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ToSql, FromSql, serde::Serialize, serde::Deserialize)]
#[postgres(name = "segment_operation")]
#[serde(rename_all = "lowercase")]
pub enum Operation {
	#[postgres(name = "added")]
	Added,
	#[postgres(name = "removed")]
	Removed,
}

impl Operation {
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Added => "added",
			Self::Removed => "removed",
		}
	}
}

impl std::fmt::Display for Operation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
