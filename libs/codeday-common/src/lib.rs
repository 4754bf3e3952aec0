pub mod config;
pub mod redis;
pub mod seed;
pub mod store;
pub mod types;
