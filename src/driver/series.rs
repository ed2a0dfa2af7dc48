use super::trial::{Trial, TrialRecord};
use super::Plan;
use crate::workload::WorkloadSpec;
use log::info;

/// `tries` trials at one worker count, reduced to averages.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerCountSummary {
    pub workers: usize,
    /// Every trial was clean
    pub clean: bool,
    /// Mean observed trial duration, seconds
    pub avg_duration: f64,
    pub avg_score: f64,
    /// `avg_score / avg_duration`; NaN when the mean duration is zero
    pub throughput: f64,
}

/// Reduce a set of trials run at `workers` workers. An empty set gives a
/// non-clean summary with NaN averages.
#[must_use]
pub fn summarize(workers: usize, records: &[TrialRecord]) -> WorkerCountSummary {
    let tries = records.len() as f64;
    let clean = !records.is_empty() && records.iter().all(|record| record.clean);
    let avg_duration = records
        .iter()
        .map(|record| record.duration.as_secs_f64())
        .sum::<f64>()
        / tries;
    let avg_score = records.iter().map(|record| record.score as f64).sum::<f64>() / tries;
    let throughput = if avg_duration > 0.0 {
        avg_score / avg_duration
    } else {
        f64::NAN
    };

    WorkerCountSummary {
        workers,
        clean,
        avg_duration,
        avg_score,
        throughput,
    }
}

/// Run the plan's trials for one workload: every worker count in the given
/// order, `tries` sequential trials each. Trials never overlap.
#[must_use]
pub fn run_series(spec: &WorkloadSpec, plan: &Plan) -> Vec<WorkerCountSummary> {
    plan.worker_counts
        .iter()
        .map(|&workers| {
            let records: Vec<TrialRecord> = (0..plan.tries)
                .map(|_| Trial::new(spec, workers, plan.duration, plan.grace).run())
                .collect();
            let summary = summarize(workers, &records);
            info!(
                "{:<24} processes: {:>3}, exit: {:<5}, duration: {:.3}s, value: {:.0}, performance: {:.1}/s",
                spec.name,
                summary.workers,
                summary.clean,
                summary.avg_duration,
                summary.avg_score,
                summary.throughput
            );
            summary
        })
        .collect()
}
