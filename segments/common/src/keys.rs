/// Name of the CSV file an export of the given month is written to.
pub fn export_file_name(year: i32, month: u32) -> String {
	format!("user_segments_{year:04}_{month:02}_01.csv")
}
