//! Deterministic Simulation Testing (DST) infrastructure.
//!
//! Runs many lookups at once against one shared cache, delivering page
//! fetch completions in a seeded random order, and checks after every driver
//! call that:
//! - stages only move forward
//! - no page stays pinned between driver calls
//! - each lookup finishes within its depth bound
//! - results match the data the tree was built from
//! - a complete lookup stays complete without touching the cache
//!
//! # Design Principles
//!
//! 1. All randomness is seeded for reproducibility
//! 2. Faults can be injected at the page store
//! 3. Given the same seed, execution is identical
//!
//! # Usage
//!
//! ```ignore
//! use simulation::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(12345) // seed
//!     .with_abort_rate(0.1)
//!     .with_fault_rate(0.01);
//!
//! let mut sim = Simulator::new(config);
//! let result = sim.run(1000); // Run 1000 lookups
//!
//! assert!(result.invariant_violations.is_empty());
//! ```

mod invariants;

pub use invariants::{InvariantChecker, InvariantViolation};
pub use simulator::{SimulationResult, Simulator, SimulatorConfig};
