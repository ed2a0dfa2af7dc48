//! Node micro-benchmark harness.
//!
//! Runs each workload on `P` worker threads for a fixed wall-clock duration,
//! counts the iterations they complete and turns the counts into a
//! throughput figure. Repeating this for `P = 1..N` shows how single-core
//! throughput scales across the machine's cores.
//!
//! driver -> series -> trial -> worker -> workload

pub mod cli;
pub mod driver;
pub mod error;
pub mod machine;
pub mod report;
pub mod worker;
pub mod workload;

pub use error::{Error, Result};
