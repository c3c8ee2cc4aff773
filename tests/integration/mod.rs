//! Integration tests module
//!
//! This module organizes all integration tests for the r-jellytrack library.

pub mod config_test;
pub mod jellyfin_client_test;
pub mod tracker_test;
