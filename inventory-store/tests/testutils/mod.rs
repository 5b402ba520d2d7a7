//! Test utilities for Inventory Store integration tests
//!
//! Provides the TestStore fixture: an isolated store in a scratch directory
//! that can be reopened to exercise recovery.

pub mod test_fixture;
