use super::{StopSignal, Workload};
use std::hint::black_box;

/// Bare loop overhead: each iteration is one counter increment.
#[derive(Debug, Default)]
pub struct ForLoop;

impl ForLoop {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Workload for ForLoop {
    fn run(&mut self, stop: &StopSignal) -> u64 {
        let mut score = 0u64;
        while !stop.is_raised() {
            score = black_box(score + 1);
        }
        score
    }
}
