//! Foundation module - Core utilities shared by the RHI
//!
//! This module provides:
//! - Logging setup on top of the `log` facade

pub mod logging;
