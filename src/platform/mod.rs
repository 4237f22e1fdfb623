//! Platform abstraction layer.
//!
//! Provides consistent interfaces for:
//! - External process execution (`runner`)
//! - Local user and filesystem information (`linux`)

pub mod linux;
pub mod runner;
