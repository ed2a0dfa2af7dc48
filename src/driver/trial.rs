use crate::worker::{WorkerHandle, WorkerStatus};
use crate::workload::WorkloadSpec;
use log::{debug, trace};
use std::thread;
use std::time::{Duration, Instant};

// Every worker gets at least this long to hand back its score, even after
// an unresponsive sibling has used up the shared grace deadline.
const MIN_JOIN_WAIT: Duration = Duration::from_millis(25);

/// The outcome of running `workers` copies of one workload side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub workers: usize,
    /// Observed wall time, from first start to last join. At least the
    /// requested duration.
    pub duration: Duration,
    /// Sum of every worker's score
    pub score: u64,
    /// Every worker terminated by signal
    pub clean: bool,
    pub statuses: Vec<WorkerStatus>,
}

/// A single timed execution. Workers are created fresh for every trial so
/// that stateful workloads start from the same point each time.
pub struct Trial<'a> {
    spec: &'a WorkloadSpec,
    n_workers: usize,
    duration: Duration,
    grace: Duration,
}

impl<'a> Trial<'a> {
    #[must_use]
    pub fn new(spec: &'a WorkloadSpec, n_workers: usize, duration: Duration, grace: Duration) -> Self {
        Self {
            spec,
            n_workers,
            duration,
            grace,
        }
    }

    /// Start every worker, let them run for the trial duration, signal them
    /// all, then join them against one shared grace deadline. Each join still
    /// waits at least `MIN_JOIN_WAIT`, so the whole trial is bounded by
    /// `duration + grace + n_workers * MIN_JOIN_WAIT` plus scheduling noise.
    pub fn run(&self) -> TrialRecord {
        trace!(
            "Trial: {} x{} for {:?}",
            self.spec.name,
            self.n_workers,
            self.duration
        );
        let mut workers: Vec<WorkerHandle> = (0..self.n_workers)
            .map(|id| WorkerHandle::new(id, self.spec))
            .collect();

        let start_time = Instant::now();
        for worker in &mut workers {
            worker.start();
        }

        thread::sleep(self.duration);

        // signal everyone before waiting on anyone
        for worker in &mut workers {
            worker.request_stop();
        }
        let deadline = Instant::now() + self.grace;
        let min_wait = MIN_JOIN_WAIT.min(self.grace);
        let statuses: Vec<WorkerStatus> = workers
            .iter_mut()
            .map(|worker| {
                let remaining = deadline.saturating_duration_since(Instant::now());
                worker.join(remaining.max(min_wait))
            })
            .collect();
        let duration = start_time.elapsed();

        let score = workers
            .iter()
            .map(WorkerHandle::final_score)
            .fold(0u64, u64::saturating_add);
        let clean = statuses.iter().all(|status| status.is_clean());

        debug!(
            "Trial: {} x{}: score {score} in {:.3}s, clean: {clean}",
            self.spec.name,
            self.n_workers,
            duration.as_secs_f64()
        );

        TrialRecord {
            workers: self.n_workers,
            duration,
            score,
            clean,
            statuses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::tests::{Stubborn, IGNORE_FOR, RESPONSIVE, STUBBORN};
    use crate::workload::{self, StopSignal, Workload};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SHORT_GRACE: Duration = Duration::from_millis(40);

    /// Takes longer than `SHORT_GRACE` but less than `SHORT_GRACE +
    /// MIN_JOIN_WAIT` to wind down after the signal.
    struct Lingering;

    impl Workload for Lingering {
        fn run(&mut self, stop: &StopSignal) -> u64 {
            let mut score = 0;
            while !stop.is_raised() {
                score += 1;
                thread::sleep(Duration::from_micros(50));
            }
            thread::sleep(SHORT_GRACE + Duration::from_millis(10));
            score
        }
    }

    static INSTANCES: AtomicUsize = AtomicUsize::new(0);

    // first instance ignores its stop flag, the rest linger briefly
    static MIXED: WorkloadSpec = WorkloadSpec {
        name: "mixed",
        description: "one stubborn worker among lingering ones",
        factory: || {
            let workload: Box<dyn Workload> = if INSTANCES.fetch_add(1, Ordering::SeqCst) == 0 {
                Box::new(Stubborn)
            } else {
                Box::new(Lingering)
            };
            workload
        },
    };

    const GRACE: Duration = Duration::from_millis(200);

    #[test]
    fn test_responsive_trial_is_clean() {
        for n_workers in [1, 2, 3] {
            let record = Trial::new(&RESPONSIVE, n_workers, Duration::from_millis(50), GRACE).run();
            assert!(record.clean, "{n_workers} workers: {:?}", record.statuses);
            assert_eq!(record.workers, n_workers);
            assert_eq!(record.statuses.len(), n_workers);
            assert!(record.score > 0);
            assert!(record.duration >= Duration::from_millis(50));
        }
    }

    #[test]
    fn test_stubborn_trial_is_bounded_and_not_clean() {
        let duration = Duration::from_millis(50);
        let started = Instant::now();
        let record = Trial::new(&STUBBORN, 4, duration, GRACE).run();
        let elapsed = started.elapsed();
        assert!(!record.clean);
        assert!(record
            .statuses
            .iter()
            .all(|&status| status == WorkerStatus::Unresponsive));
        assert_eq!(record.score, 0);
        assert!(elapsed < duration + GRACE + Duration::from_millis(500));
        assert!(elapsed < IGNORE_FOR);
    }

    #[test]
    fn test_score_grows_with_duration() {
        let spec = workload::lookup("for-loop").unwrap();
        let short = Trial::new(spec, 1, Duration::from_millis(20), GRACE).run();
        let long = Trial::new(spec, 1, Duration::from_millis(200), GRACE).run();
        assert!(short.clean && long.clean);
        assert!(long.score >= short.score);
    }

    #[test]
    fn test_stuck_worker_does_not_starve_later_joins() {
        let record = Trial::new(&MIXED, 3, Duration::from_millis(30), SHORT_GRACE).run();
        assert!(!record.clean);
        assert_eq!(record.statuses[0], WorkerStatus::Unresponsive);
        assert_eq!(record.statuses[1..], [WorkerStatus::TerminatedBySignal; 2]);
        assert!(record.score > 0);
        assert!(record.duration < IGNORE_FOR);
    }
}
