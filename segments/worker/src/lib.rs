pub mod config;
pub mod consumer;
pub mod export;
pub mod global;
pub mod scheduler;

#[cfg(test)]
mod tests;
