pub mod cli;
pub mod config;
pub mod links;
pub mod log;
pub mod state;
