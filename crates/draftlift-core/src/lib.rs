pub mod config;
pub mod credentials;
pub mod execution;
pub mod git;
pub mod models;
pub mod persistence;
pub mod publish;
pub mod redact;
pub mod schedule;
pub mod scheduler;
pub mod slug;
pub mod timestamp;
pub mod validate;
