pub mod command;
pub mod config;
pub mod console;
pub mod fetcher;
pub mod identifier;
pub mod interpreter;
pub mod logging;
pub mod panel;
pub mod session;
pub mod transcript;
