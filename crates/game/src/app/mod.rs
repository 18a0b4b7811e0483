mod admin;
pub(crate) mod bootstrap;
mod config;
mod console;
mod executor;
pub(crate) mod loop_runner;
