//! Application layer containing the request orchestration.
//!
//! This module defines the `LendingService`, which validates requests, runs
//! the amortization rules from the domain layer and persists the results
//! through the storage ports.

pub mod service;
