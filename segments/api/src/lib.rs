pub mod channel;
pub mod config;
pub mod directory;
pub mod error;
pub mod migration;
pub mod sampler;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;
