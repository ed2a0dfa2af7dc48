use super::{StopSignal, Workload};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

// Every instance starts from the same seed so trials are repeatable.
const SEED: u64 = 1234;
const CREATE_SIZE: usize = 100;
const SOLVE_SIZE: usize = 32;

/// Dense, square, row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    size: usize,
    data: Vec<f64>,
}

impl Matrix {
    #[must_use]
    pub fn identity(size: usize) -> Self {
        let mut data = vec![0.0; size * size];
        for i in 0..size {
            data[i * size + i] = 1.0;
        }
        Self { size, data }
    }

    /// Samples uniformly from [0, 1).
    pub fn random(size: usize, rng: &mut impl Rng) -> Self {
        let data = (0..size * size).map(|_| rng.gen::<f64>()).collect();
        Self { size, data }
    }

    #[cfg(test)]
    fn size(&self) -> usize {
        self.size
    }

    #[cfg(test)]
    fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.size + col]
    }

    #[cfg(test)]
    fn multiply(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.size, other.size);
        let n = self.size;
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for k in 0..n {
                let a = self.get(i, k);
                for j in 0..n {
                    data[i * n + j] += a * other.get(k, j);
                }
            }
        }
        Matrix { size: n, data }
    }

    /// Gauss-Jordan elimination with partial pivoting. `None` when singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Matrix> {
        let n = self.size;
        let mut work = self.data.clone();
        let mut inverse = Matrix::identity(n);

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&a, &b| work[a * n + col].abs().total_cmp(&work[b * n + col].abs()))?;
            if work[pivot * n + col].abs() < f64::EPSILON {
                return None;
            }
            if pivot != col {
                for j in 0..n {
                    work.swap(pivot * n + j, col * n + j);
                    inverse.data.swap(pivot * n + j, col * n + j);
                }
            }

            let scale = work[col * n + col];
            for j in 0..n {
                work[col * n + j] /= scale;
                inverse.data[col * n + j] /= scale;
            }

            for row in (0..n).filter(|&row| row != col) {
                let factor = work[row * n + col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    work[row * n + j] -= factor * work[col * n + j];
                    inverse.data[row * n + j] -= factor * inverse.data[col * n + j];
                }
            }
        }
        Some(inverse)
    }
}

/// Fixed-size random matrix fill.
#[derive(Debug)]
pub struct MatrixCreate {
    rng: StdRng,
}

impl Default for MatrixCreate {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixCreate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(SEED),
        }
    }
}

impl Workload for MatrixCreate {
    fn run(&mut self, stop: &StopSignal) -> u64 {
        let mut score = 0u64;
        while !stop.is_raised() {
            black_box(Matrix::random(CREATE_SIZE, &mut self.rng));
            score += 1;
        }
        score
    }
}

/// Iteration `i` fills an `(i + 1)` square matrix, so cost per iteration
/// grows quadratically over the trial and scores are not comparable
/// across durations.
#[derive(Debug)]
pub struct MatrixCreateGrowing {
    rng: StdRng,
}

impl Default for MatrixCreateGrowing {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixCreateGrowing {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(SEED),
        }
    }
}

impl Workload for MatrixCreateGrowing {
    fn run(&mut self, stop: &StopSignal) -> u64 {
        let mut score = 0u64;
        while !stop.is_raised() {
            black_box(Matrix::random(score as usize + 1, &mut self.rng));
            score += 1;
        }
        score
    }
}

#[derive(Debug)]
pub struct MatrixSolve {
    rng: StdRng,
}

impl Default for MatrixSolve {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixSolve {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(SEED),
        }
    }
}

impl Workload for MatrixSolve {
    fn run(&mut self, stop: &StopSignal) -> u64 {
        let mut score = 0u64;
        while !stop.is_raised() {
            let matrix = Matrix::random(SOLVE_SIZE, &mut self.rng);
            // a singular draw still costs a full elimination, so it counts
            black_box(matrix.inverse());
            score += 1;
        }
        score
    }
}
