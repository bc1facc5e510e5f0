//! Run coordination: warm-up, measurement, merge
//!
//! The coordinator owns the full lifecycle of one run. It spawns one OS
//! thread per configured worker, lets the workers drive the target for the
//! configured window, raises the shared stop flag, joins every thread
//! without a timeout, and merges the privately accumulated worker statistics
//! on its own thread. A warm-up pass, when configured, runs the identical
//! machinery first and its results are discarded entirely.

mod builder;
mod executor;

pub use builder::CoordinatorBuilder;
pub use executor::Coordinator;
