//! Integration tests module
//!
//! End-to-end tests for the rollcall sync path, including:
//! - Capture → deliver or queue → drain on reconnect
//! - Queue recovery after a simulated restart
//! - REST sink behavior against a mock server
//! - Error handling and recovery scenarios

pub mod error_scenarios;
pub mod fixtures;
pub mod offline_scenario_test;
pub mod rest_sink_test;
pub mod restart_test;
