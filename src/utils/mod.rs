//! Utility functions and helpers
//!
//! Timers (debounce, throttle, hold), logging setup and application paths.

pub mod app_paths;
pub mod debouncer;
pub mod logging;
