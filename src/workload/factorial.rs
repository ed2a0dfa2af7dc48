use super::{StopSignal, Workload};
use std::hint::black_box;

// 20! overflows u64, so stay below it. Rotating keeps the cost per
// iteration constant for the whole trial.
const OPERANDS: [u64; 10] = [10, 11, 12, 13, 14, 15, 16, 17, 18, 19];

#[derive(Debug, Default)]
pub struct Factorial;

impl Factorial {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[must_use]
pub fn factorial(n: u64) -> u64 {
    (1..=n).product()
}

impl Workload for Factorial {
    fn run(&mut self, stop: &StopSignal) -> u64 {
        let mut score = 0u64;
        while !stop.is_raised() {
            let n = OPERANDS[(score % OPERANDS.len() as u64) as usize];
            black_box(factorial(black_box(n)));
            score += 1;
        }
        score
    }
}
