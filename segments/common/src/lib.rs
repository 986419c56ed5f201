pub mod command;
pub mod database;
pub mod keys;
pub mod time;

#[cfg(test)]
mod tests;
