//! Workflow tests for account provisioning.
//!
//! This module covers identifier validation, end-to-end provisioning,
//! field-level updates, and deletion.

pub mod provision_tests;
