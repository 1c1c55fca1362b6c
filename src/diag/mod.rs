//! Diagnostics for the tile cache.
//!
//! These back the `wsi-tilecache` binary:
//!
//! - [`run_stress`]: many readers against a shared cache that keeps being
//!   swapped out from under them
//! - [`simulate`]: sequential replay showing what stays resident

mod simulate;
mod stress;

pub use simulate::{simulate, SimulationReport};
pub use stress::{run_stress, StressReport};
