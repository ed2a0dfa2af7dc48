use crate::workload::{StopSignal, Workload, WorkloadSpec};
use log::{trace, warn};
use std::fmt::{self, Display, Formatter};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How a worker ended, as seen by its owner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Was running when signalled and exited within the grace period.
    TerminatedBySignal,
    /// Had already exited before it was signalled.
    AlreadyStopped,
    /// Did not exit within the grace period. The thread is abandoned.
    Unresponsive,
    /// Never started or panicked before handing back a score.
    Failed,
}

impl WorkerStatus {
    #[must_use]
    pub fn is_clean(self) -> bool {
        self == WorkerStatus::TerminatedBySignal
    }
}

impl Display for WorkerStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let label = match self {
            WorkerStatus::TerminatedBySignal => "terminated-by-signal",
            WorkerStatus::AlreadyStopped => "already-stopped",
            WorkerStatus::Unresponsive => "unresponsive",
            WorkerStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// One concurrently running workload instance.
///
/// Lifecycle: `new` -> `start` -> `request_stop` -> `join` -> `final_score`.
/// The workload runs on its own thread with its own state; the only thing
/// shared with the owner is the stop flag and the one-shot channel the
/// score comes back on. A handle is used for exactly one trial.
pub struct WorkerHandle {
    id: usize,
    name: &'static str,
    stop: StopSignal,
    workload: Option<Box<dyn Workload>>,
    score_rx: Option<Receiver<u64>>,
    thread: Option<JoinHandle<()>>,
    running_at_stop: Option<bool>,
    status: Option<WorkerStatus>,
    score: u64,
}

impl WorkerHandle {
    #[must_use]
    pub fn new(id: usize, spec: &WorkloadSpec) -> Self {
        Self {
            id,
            name: spec.name,
            stop: StopSignal::new(),
            workload: Some(spec.instantiate()),
            score_rx: None,
            thread: None,
            running_at_stop: None,
            status: None,
            score: 0,
        }
    }

    /// Launch the workload. A handle can only be started once; later calls
    /// are ignored.
    pub fn start(&mut self) {
        let Some(mut workload) = self.workload.take() else {
            warn!("worker {}/{}: already started", self.name, self.id);
            return;
        };

        let (score_tx, score_rx) = mpsc::channel();
        let stop = self.stop.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.name, self.id))
            .spawn(move || {
                let score = workload.run(&stop);
                // the owner may have given up on us already
                let _ = score_tx.send(score);
            });

        match spawned {
            Ok(thread) => {
                trace!("worker {}/{}: started", self.name, self.id);
                self.thread = Some(thread);
                self.score_rx = Some(score_rx);
            }
            Err(e) => warn!("worker {}/{}: failed to spawn: {e}", self.name, self.id),
        }
    }

    /// Raise the stop flag. Never blocks, safe to call repeatedly; only the
    /// first call records whether the worker was still running.
    pub fn request_stop(&mut self) {
        if self.running_at_stop.is_none() {
            let running = self
                .thread
                .as_ref()
                .is_some_and(|thread| !thread.is_finished());
            self.running_at_stop = Some(running);
        }
        self.stop.raise();
        trace!("worker {}/{}: stop requested", self.name, self.id);
    }

    /// Wait at most `grace` for the worker to hand back its score. Always
    /// returns; a worker that misses the deadline is left to run detached.
    pub fn join(&mut self, grace: Duration) -> WorkerStatus {
        if let Some(status) = self.status {
            return status;
        }

        let status = match self.score_rx.take() {
            None => WorkerStatus::Failed,
            Some(score_rx) => match score_rx.recv_timeout(grace) {
                Ok(score) => {
                    self.score = score;
                    // sending is the thread's last act, so this is immediate
                    if let Some(thread) = self.thread.take() {
                        let _ = thread.join();
                    }
                    if self.running_at_stop == Some(true) {
                        WorkerStatus::TerminatedBySignal
                    } else {
                        WorkerStatus::AlreadyStopped
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "worker {}/{}: no exit within {grace:?}, abandoning",
                        self.name, self.id
                    );
                    // a worker joined without request_stop must still be told
                    // to stop before it is detached
                    self.stop.raise();
                    self.thread = None;
                    WorkerStatus::Unresponsive
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if let Some(Err(panic)) = self.thread.take().map(JoinHandle::join) {
                        let reason = panic
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| panic.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| String::from("unknown panic"));
                        warn!("worker {}/{}: panicked: {reason}", self.name, self.id);
                    }
                    WorkerStatus::Failed
                }
            },
        };

        trace!("worker {}/{}: joined as {status}", self.name, self.id);
        self.status = Some(status);
        status
    }

    /// The workload's score. Zero until `join` has returned, and zero for a
    /// worker that never handed one back.
    #[must_use]
    pub fn final_score(&self) -> u64 {
        if self.status.is_some() {
            self.score
        } else {
            0
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<WorkerStatus> {
        self.status
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // nobody will join a worker once its handle is gone
        self.stop.raise();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Instant;

    /// Ignores the stop flag for `IGNORE_FOR`, then exits.
    pub(crate) struct Stubborn;

    pub(crate) const IGNORE_FOR: Duration = Duration::from_millis(1500);

    impl Workload for Stubborn {
        fn run(&mut self, _stop: &StopSignal) -> u64 {
            thread::sleep(IGNORE_FOR);
            1
        }
    }

    pub(crate) static STUBBORN: WorkloadSpec = WorkloadSpec {
        name: "stubborn",
        description: "never checks its stop flag",
        factory: || Box::new(Stubborn),
    };

    /// Returns immediately without waiting for the signal.
    struct Eager;

    impl Workload for Eager {
        fn run(&mut self, _stop: &StopSignal) -> u64 {
            7
        }
    }

    static EAGER: WorkloadSpec = WorkloadSpec {
        name: "eager",
        description: "exits on its own",
        factory: || Box::new(Eager),
    };

    struct Panicky;

    impl Workload for Panicky {
        fn run(&mut self, _stop: &StopSignal) -> u64 {
            panic!("workload blew up");
        }
    }

    static PANICKY: WorkloadSpec = WorkloadSpec {
        name: "panicky",
        description: "panics mid-computation",
        factory: || Box::new(Panicky),
    };

    /// Counts iterations until signalled.
    pub(crate) struct Responsive;

    impl Workload for Responsive {
        fn run(&mut self, stop: &StopSignal) -> u64 {
            let mut score = 0;
            while !stop.is_raised() {
                score += 1;
                thread::sleep(Duration::from_micros(50));
            }
            score
        }
    }

    pub(crate) static RESPONSIVE: WorkloadSpec = WorkloadSpec {
        name: "responsive",
        description: "checks its stop flag every iteration",
        factory: || Box::new(Responsive),
    };

    const GRACE: Duration = Duration::from_millis(200);

    #[test]
    fn test_responsive_worker_terminates_by_signal() {
        let mut worker = WorkerHandle::new(0, &RESPONSIVE);
        worker.start();
        thread::sleep(Duration::from_millis(30));
        worker.request_stop();
        assert_eq!(worker.join(GRACE), WorkerStatus::TerminatedBySignal);
        assert!(worker.final_score() > 0);
    }

    #[test]
    fn test_finished_worker_is_already_stopped() {
        let mut worker = WorkerHandle::new(0, &EAGER);
        worker.start();
        thread::sleep(Duration::from_millis(50));
        worker.request_stop();
        assert_eq!(worker.join(GRACE), WorkerStatus::AlreadyStopped);
        assert_eq!(worker.final_score(), 7);
    }

    #[test]
    fn test_stubborn_worker_join_is_bounded() {
        let mut worker = WorkerHandle::new(0, &STUBBORN);
        worker.start();
        worker.request_stop();
        let started = Instant::now();
        assert_eq!(worker.join(GRACE), WorkerStatus::Unresponsive);
        assert!(started.elapsed() < GRACE + Duration::from_millis(500));
        assert!(started.elapsed() < IGNORE_FOR);
        assert_eq!(worker.final_score(), 0);
    }

    #[test]
    fn test_panicking_worker_fails() {
        let mut worker = WorkerHandle::new(0, &PANICKY);
        worker.start();
        worker.request_stop();
        assert_eq!(worker.join(GRACE), WorkerStatus::Failed);
        assert_eq!(worker.final_score(), 0);
    }

    #[test]
    fn test_unstarted_worker_fails() {
        let mut worker = WorkerHandle::new(0, &RESPONSIVE);
        worker.request_stop();
        assert_eq!(worker.join(GRACE), WorkerStatus::Failed);
    }

    #[test]
    fn test_stop_and_join_are_idempotent() {
        let mut worker = WorkerHandle::new(0, &RESPONSIVE);
        worker.start();
        worker.start();
        thread::sleep(Duration::from_millis(10));
        worker.request_stop();
        worker.request_stop();
        let status = worker.join(GRACE);
        let score = worker.final_score();
        assert_eq!(status, WorkerStatus::TerminatedBySignal);
        assert_eq!(worker.join(GRACE), status);
        assert_eq!(worker.final_score(), score);
        assert_eq!(worker.status(), Some(status));
    }

    #[test]
    fn test_score_hidden_before_join() {
        let mut worker = WorkerHandle::new(0, &EAGER);
        worker.start();
        assert_eq!(worker.final_score(), 0);
        worker.request_stop();
        worker.join(GRACE);
        assert_eq!(worker.final_score(), 7);
    }

    #[test]
    fn test_unsignalled_join_timeout_raises_stop() {
        let mut worker = WorkerHandle::new(0, &RESPONSIVE);
        worker.start();
        let stop = worker.stop.clone();
        assert_eq!(worker.join(Duration::from_millis(20)), WorkerStatus::Unresponsive);
        assert!(stop.is_raised());
    }

    #[test]
    fn test_drop_raises_stop() {
        let mut worker = WorkerHandle::new(0, &RESPONSIVE);
        worker.start();
        let stop = worker.stop.clone();
        assert!(!stop.is_raised());
        drop(worker);
        assert!(stop.is_raised());
    }
}
