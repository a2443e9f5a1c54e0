pub mod commands;
pub mod config;
pub mod event;
pub mod probe;
pub mod queue;
pub mod supervisor;
