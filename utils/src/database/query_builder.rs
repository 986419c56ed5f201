use std::sync::Arc;

use postgres_from_row::FromRow;
use postgres_types::{FromSql, ToSql};
use tokio_postgres::{Error, Row};

pub fn query<'a>(query: impl ToString) -> QueryBuilder<'a> {
	QueryBuilder::new(query)
}

/// A SQL statement together with its owned bind parameters.
///
/// Parameters are bound positionally in the order [`QueryBuilder::bind`] is
/// called, so the statement text must use `$1`, `$2`, ... accordingly.
#[derive(Default)]
pub struct QueryBuilder<'a> {
	query: String,
	params: Vec<Box<dyn ToSql + Send + Sync + 'a>>,
}

impl<'args> QueryBuilder<'args> {
	pub fn new(query: impl ToString) -> Self {
		Self {
			query: query.to_string(),
			params: Vec::new(),
		}
	}

	pub fn bind(&mut self, param: impl ToSql + Send + Sync + 'args) -> &mut Self {
		self.params.push(Box::new(param));
		self
	}

	pub fn build(&self) -> Query<'_, NoParse, Row> {
		Query {
			query: &self.query,
			params: &self.params,
			_marker: std::marker::PhantomData,
		}
	}

	pub fn build_query_as<T: FromRow>(&self) -> Query<'_, FromRowParse<T>, T> {
		Query {
			query: &self.query,
			params: &self.params,
			_marker: std::marker::PhantomData,
		}
	}

	pub fn build_query_single_scalar<T: for<'a> FromSql<'a>>(&self) -> Query<'_, SingleScalarParse<T>, T> {
		Query {
			query: &self.query,
			params: &self.params,
			_marker: std::marker::PhantomData,
		}
	}

	pub fn sql(&self) -> &str {
		self.query.as_str()
	}

	pub fn param_count(&self) -> usize {
		self.params.len()
	}
}

pub struct SingleScalarParse<T>(std::marker::PhantomData<T>);

pub struct FromRowParse<T>(std::marker::PhantomData<T>);

pub struct NoParse;

pub trait RowParse {
	type Item;

	fn try_from_row(row: Row) -> Result<Self::Item, Error>;
}

impl<T> RowParse for SingleScalarParse<T>
where
	T: for<'a> FromSql<'a>,
{
	type Item = T;

	#[inline]
	fn try_from_row(row: Row) -> Result<Self::Item, Error> {
		row.try_get(0)
	}
}

impl<T: FromRow> RowParse for FromRowParse<T> {
	type Item = T;

	#[inline]
	fn try_from_row(row: Row) -> Result<Self::Item, Error> {
		T::try_from_row(&row)
	}
}

impl RowParse for NoParse {
	type Item = Row;

	#[inline]
	fn try_from_row(row: Row) -> Result<Self::Item, Error> {
		Ok(row)
	}
}

pub struct Query<'a, T: RowParse<Item = O>, O> {
	query: &'a str,
	params: &'a [Box<dyn ToSql + Send + Sync + 'a>],
	_marker: std::marker::PhantomData<(T, O)>,
}

fn params<'a>(params: &'a [Box<dyn ToSql + Send + Sync + 'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
	params.iter().map(|param| param.as_ref() as _).collect()
}

/// Anything a [`Query`] can run against: a pool, a pooled connection or an
/// open transaction.
pub trait ClientLike: Send + Sync {
	#[doc(hidden)]
	fn query_builder_client(
		&self,
	) -> impl std::future::Future<Output = Result<impl AsRef<tokio_postgres::Client> + '_, deadpool_postgres::PoolError>> + Send;
}

struct ClientRef<'a>(&'a tokio_postgres::Client);

impl AsRef<tokio_postgres::Client> for ClientRef<'_> {
	fn as_ref(&self) -> &tokio_postgres::Client {
		self.0
	}
}

struct PooledClient(deadpool_postgres::Client);

impl AsRef<tokio_postgres::Client> for PooledClient {
	fn as_ref(&self) -> &tokio_postgres::Client {
		self.0.as_ref()
	}
}

impl ClientLike for tokio_postgres::Client {
	async fn query_builder_client(&self) -> Result<impl AsRef<tokio_postgres::Client> + '_, deadpool_postgres::PoolError> {
		Ok(ClientRef(self))
	}
}

impl ClientLike for deadpool_postgres::Pool {
	async fn query_builder_client(&self) -> Result<impl AsRef<tokio_postgres::Client> + '_, deadpool_postgres::PoolError> {
		Ok(PooledClient(self.get().await?))
	}
}

impl ClientLike for deadpool_postgres::Client {
	async fn query_builder_client(&self) -> Result<impl AsRef<tokio_postgres::Client> + '_, deadpool_postgres::PoolError> {
		Ok(ClientRef(self.as_ref()))
	}
}

impl ClientLike for deadpool_postgres::Transaction<'_> {
	async fn query_builder_client(&self) -> Result<impl AsRef<tokio_postgres::Client> + '_, deadpool_postgres::PoolError> {
		Ok(ClientRef(self.client()))
	}
}

impl<T: ClientLike + Sync + Send> ClientLike for Arc<T> {
	async fn query_builder_client(&self) -> Result<impl AsRef<tokio_postgres::Client> + '_, deadpool_postgres::PoolError> {
		self.as_ref().query_builder_client().await
	}
}

impl<T: ClientLike + Sync> ClientLike for &T {
	async fn query_builder_client(&self) -> Result<impl AsRef<tokio_postgres::Client> + '_, deadpool_postgres::PoolError> {
		(*self).query_builder_client().await
	}
}

impl<T: RowParse<Item = O>, O> Query<'_, T, O> {
	pub async fn execute(self, conn: impl ClientLike) -> Result<u64, deadpool_postgres::PoolError> {
		Ok(conn
			.query_builder_client()
			.await?
			.as_ref()
			.execute(self.query, &params(self.params))
			.await?)
	}

	pub async fn fetch_all(self, conn: impl ClientLike) -> Result<Vec<O>, deadpool_postgres::PoolError> {
		Ok(conn
			.query_builder_client()
			.await?
			.as_ref()
			.query(self.query, &params(self.params))
			.await?
			.into_iter()
			.map(T::try_from_row)
			.collect::<Result<_, Error>>()?)
	}

	pub async fn fetch_one(self, conn: impl ClientLike) -> Result<O, deadpool_postgres::PoolError> {
		Ok(T::try_from_row(
			conn.query_builder_client()
				.await?
				.as_ref()
				.query_one(self.query, &params(self.params))
				.await?,
		)?)
	}

	pub async fn fetch_optional(self, conn: impl ClientLike) -> Result<Option<O>, deadpool_postgres::PoolError> {
		Ok(conn
			.query_builder_client()
			.await?
			.as_ref()
			.query_opt(self.query, &params(self.params))
			.await?
			.map(T::try_from_row)
			.transpose()?)
	}
}
