//! In-memory adapters for the core infrastructure traits.
//!
//! These back the service when no external store or cache is configured and
//! are used throughout the test suites.

pub mod memory_cache;
pub mod memory_rule_store;

pub use memory_cache::InMemoryResolutionCache;
pub use memory_rule_store::InMemoryRuleStore;
