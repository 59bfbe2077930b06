//! Shared harness for the relay and export job integration tests.

pub mod mocks;
