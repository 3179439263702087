//! End-to-end tests at the lookup/host boundary.
//!
//! Each test file covers a specific scenario, driving lookups the way a
//! host event loop would: `advance`, complete fetches, feed events back.

#![cfg(test)]

mod helpers;

mod test_abort;
mod test_checksum_failure;
mod test_empty_tree;
mod test_fetch_failure;
mod test_file_backed_lookup;
mod test_invalid_events;
mod test_shared_cache;
mod test_single_leaf;
mod test_two_level_cold_cache;
mod test_wire_incr_round_trip;
