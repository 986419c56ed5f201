#[cfg(all(feature = "context", feature = "prelude"))]
mod context;
#[cfg(feature = "database")]
mod database;
