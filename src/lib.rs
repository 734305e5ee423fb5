pub mod config;
pub mod executor;
pub mod predict;
pub mod scheduler;
