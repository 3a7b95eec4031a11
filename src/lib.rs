pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod migrations;

#[cfg(test)]
pub mod testing;
