//! Worker task: one thread driving the request-response loop
//!
//! The Worker is the engine's core execution unit and its loop is
//! deliberately minimal: **pick variant -> borrow connection -> write request
//! -> frame response -> classify -> repeat** until the shared stop flag is
//! observed. Everything the loop touches — connection pool, RNG, statistics —
//! is privately owned, so the only cross-thread state on the hot path is the
//! single atomic stop flag.
//!
//! Failures never escape the loop. A connect, write, read, or framing failure
//! increments the attempted variant's error count, discards the connection,
//! and moves on; the replacement opens lazily on a later attempt.

mod executor;

pub use executor::Worker;

#[cfg(test)]
mod tests;
