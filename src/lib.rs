pub mod config;
pub mod monitor;
pub mod parser;
pub mod platform;
