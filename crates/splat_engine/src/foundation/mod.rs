//! Foundation module - Core utilities and types
//!
//! - Math types and camera matrices
//! - Logging setup

pub mod logging;
pub mod math;
