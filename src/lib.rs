pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod identity;
pub mod isolation;
pub mod orchestrator;
pub mod platform;
pub mod ui;
