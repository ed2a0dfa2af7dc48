use super::{StopSignal, Workload};
use std::hint::black_box;

/// Pathological worst case, not a representative workload.
///
/// Every iteration builds a brand new string from the previous one plus `i`
/// extra characters, so both the string and the per-iteration copy grow
/// without bound for the whole trial. Scores measure how badly the
/// allocator and memcpy degrade, and drop sharply with longer durations.
#[derive(Debug)]
pub struct StringConcat {
    text: String,
}

impl Default for StringConcat {
    fn default() -> Self {
        Self::new()
    }
}

impl StringConcat {
    #[must_use]
    pub fn new() -> Self {
        Self {
            text: String::from("a"),
        }
    }

    fn step(&mut self, i: usize) {
        let mut rebuilt = String::with_capacity(self.text.len() + i);
        rebuilt.push_str(&self.text);
        rebuilt.push_str(&"a".repeat(i));
        self.text = black_box(rebuilt);
    }
}

impl Workload for StringConcat {
    fn run(&mut self, stop: &StopSignal) -> u64 {
        let mut score = 0u64;
        while !stop.is_raised() {
            self.step(score as usize);
            score += 1;
        }
        score
    }
}
