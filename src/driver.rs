pub mod series;
pub mod trial;

use crate::cli::Configuration;
use crate::workload::WorkloadSpec;
use log::info;
use series::{run_series, WorkerCountSummary};
use std::collections::BTreeMap;
use std::time::Duration;

/// Workload name to one summary per configured worker count.
pub type BenchmarkResult = BTreeMap<String, Vec<WorkerCountSummary>>;

/// What every workload is put through.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Run in this order
    pub worker_counts: Vec<usize>,
    pub tries: u32,
    pub duration: Duration,
    /// How long a signalled trial waits for its workers before abandoning them
    pub grace: Duration,
}

/// Runs the whole suite: each selected workload, in registry order, through
/// the same plan.
pub struct Driver {
    workloads: Vec<&'static WorkloadSpec>,
    plan: Plan,
}

impl Driver {
    #[must_use]
    pub fn new(configuration: &Configuration) -> Self {
        Self {
            workloads: configuration.workloads.clone(),
            plan: configuration.plan.clone(),
        }
    }

    pub fn run(&self) -> BenchmarkResult {
        info!(
            "Running tests: {:?}",
            self.workloads.iter().map(|spec| spec.name).collect::<Vec<_>>()
        );
        info!(
            "processes: {:?}, tries: {}, duration: {:?}",
            self.plan.worker_counts, self.plan.tries, self.plan.duration
        );

        let mut results = BenchmarkResult::new();
        for spec in &self.workloads {
            info!("{}: starting", spec.name);
            results.insert(spec.name.to_string(), run_series(spec, &self.plan));
        }
        results
    }
}
