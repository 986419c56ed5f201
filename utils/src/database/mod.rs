mod query_builder;

pub use deadpool_postgres::Pool;
pub use postgres_from_row::FromRow;
pub use query_builder::*;
pub use tokio_postgres::error::SqlState;
pub use {deadpool_postgres, postgres_from_row, postgres_types, tokio_postgres};

/// Returns the SQLSTATE reported by the server, if the error came from a
/// statement rather than from the pool or the connection.
pub fn sql_state(err: &deadpool_postgres::PoolError) -> Option<&SqlState> {
	match err {
		deadpool_postgres::PoolError::Backend(err) => err.code(),
		_ => None,
	}
}

#[inline]
pub fn is_unique_violation(err: &deadpool_postgres::PoolError) -> bool {
	sql_state(err) == Some(&SqlState::UNIQUE_VIOLATION)
}

#[inline]
pub fn is_foreign_key_violation(err: &deadpool_postgres::PoolError) -> bool {
	sql_state(err) == Some(&SqlState::FOREIGN_KEY_VIOLATION)
}
