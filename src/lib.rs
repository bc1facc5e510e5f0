//! apibench: load generation and latency measurement for HTTP/1.1 APIs
//!
//! This crate drives a local HTTP/1.1 target with concurrent raw-socket
//! workers and reports throughput, error and latency-percentile metrics:
//!
//! - Pre-encoded request catalogs with weighted payload mixes
//! - Blocking OS-thread workers over private keep-alive connection pools
//! - Discarded warm-up pass, cooperative shutdown, single-threaded merge
//! - Optional delegation to an installed `wrk` with sanity-checked fallback

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod framer;
pub mod percentile;
pub mod pool;
pub mod probe;
pub mod report;
pub mod runner;
pub mod stats;
pub mod worker;

pub use backend::{BuiltinEngine, LoadGenerator, WrkBackend};
pub use catalog::{Expect, PayloadSpec, RequestCatalog, ScenarioSpec};
pub use config::RunConfig;
pub use error::{Error, Result};
pub use report::{Metric, MetricReport};
pub use runner::{Coordinator, CoordinatorBuilder};
pub use stats::{AggregateStats, VariantStats, WorkerStats};
pub use worker::Worker;
