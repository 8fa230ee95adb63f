//! Request pacing
//!
//! [`SlidingWindowLimiter`] gates every outbound call; [`RateLimitLog`]
//! carries the Provider A windows across runs.

pub mod log;
pub mod window;

pub use log::RateLimitLog;
pub use window::{SlidingWindowLimiter, WindowSpec};

/// Name of the 30 second Provider A window
pub const HALFMIN: &str = "halfmin";
/// Name of the one hour Provider A window
pub const HOURLY: &str = "hourly";
/// Name of the one day Provider A window
pub const DAILY: &str = "daily";
