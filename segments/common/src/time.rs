use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Wall clock format accepted for deadlines without an offset. Interpreted in
/// the local time zone.
pub const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest stretch of wall clock time a time zone change may skip.
const MAX_GAP_MINUTES: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
	#[error("invalid timestamp: {0:?}")]
	InvalidTimestamp(String),
	#[error("{0} does not exist in the local time zone")]
	NonexistentLocalTime(NaiveDateTime),
	#[error("invalid month: {0}")]
	InvalidMonth(u32),
	#[error("invalid year: {0}")]
	InvalidYear(i32),
}

/// Parses a deadline given either as RFC 3339 or as `YYYY-MM-DD HH:MM:SS`
/// local time.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, TimeError> {
	let input = input.trim();

	if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
		return Ok(ts.with_timezone(&Utc));
	}

	let naive = NaiveDateTime::parse_from_str(input, LOCAL_FORMAT)
		.map_err(|_| TimeError::InvalidTimestamp(input.to_owned()))?;

	local_to_utc(naive)
}

fn local_to_utc(naive: NaiveDateTime) -> Result<DateTime<Utc>, TimeError> {
	// Ambiguous times (clocks turned back) resolve to the earlier instant.
	Local
		.from_local_datetime(&naive)
		.earliest()
		.map(|ts| ts.with_timezone(&Utc))
		.ok_or(TimeError::NonexistentLocalTime(naive))
}

/// Bounds of a calendar month in local time, as the half open range
/// `[first day 00:00, first day of the next month 00:00)`.
pub fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), TimeError> {
	month_bounds_in(&Local, year, month)
}

/// [`month_bounds`] in an arbitrary time zone. A month whose first midnight
/// is skipped by a clock change starts when the clocks resume.
pub fn month_bounds_in<Tz: TimeZone>(tz: &Tz, year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), TimeError> {
	if !(1..=12).contains(&month) {
		return Err(TimeError::InvalidMonth(month));
	}

	let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

	let start = first_of_month(year, month)?;
	let end = first_of_month(next_year, next_month)?;

	Ok((first_instant_from(tz, start)?, first_instant_from(tz, end)?))
}

/// Earliest instant whose wall clock time in `tz` is `naive` or the first
/// existing minute after it.
fn first_instant_from<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Utc>, TimeError> {
	let mut candidate = naive;
	for _ in 0..=MAX_GAP_MINUTES {
		if let Some(ts) = tz.from_local_datetime(&candidate).earliest() {
			return Ok(ts.with_timezone(&Utc));
		}

		candidate = candidate
			.checked_add_signed(chrono::Duration::minutes(1))
			.ok_or(TimeError::NonexistentLocalTime(naive))?;
	}

	Err(TimeError::NonexistentLocalTime(naive))
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDateTime, TimeError> {
	NaiveDate::from_ymd_opt(year, month, 1)
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.ok_or(TimeError::InvalidYear(year))
}

/// Formats an instant as local wall clock time, the inverse of the second
/// form accepted by [`parse_timestamp`].
pub fn format_local(ts: DateTime<Utc>) -> String {
	ts.with_timezone(&Local).format(LOCAL_FORMAT).to_string()
}
