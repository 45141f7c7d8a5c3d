// Library exports for integration tests and reusable components

pub mod config;

pub mod catalog;
pub mod convert;
pub mod db;
pub mod distribution;
pub mod export;
pub mod preview;

// Test support (unit tests, or integration tests with the test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
