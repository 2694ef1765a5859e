//! Configuration module
//!
//! Display, behavior and logging settings loaded from TOML.

pub mod config;
