#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics from corrupt data.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]

// Life of a lookup:
// 1. Host creates a LookupFsm for a key
// 2. Host calls advance(None)
// 3. Each step pins one page through the block cache:
//     - Superblock -> root id
//     - Internal node -> child id (parent released first)
//     - Leaf -> value or not found
// 4. A cache miss parks the lookup (Incomplete)
// 5. The host completes fetches off the event loop and calls advance(event)
//
// System components:
//  - Block cache over a page store (memory or file)
//  - Lookup state machine and driver
//  - Replication wire format

pub mod config;
pub mod event;
pub mod replication;
pub mod storage;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod simulation;
#[cfg(test)]
mod testing;
