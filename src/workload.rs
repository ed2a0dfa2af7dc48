mod factorial;
mod for_loop;
mod hash_sha;
mod matrix;
mod string_concat;

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use factorial::Factorial;
pub use for_loop::ForLoop;
pub use hash_sha::HashSha;
pub use matrix::{MatrixCreate, MatrixCreateGrowing, MatrixSolve};
pub use string_concat::StringConcat;

/// A unit of repeatable computation.
///
/// `run` loops until `stop` is raised, checking it once per iteration, and
/// returns the number of iterations it completed. The returned value is the
/// worker's score; it is handed back exactly once, after the loop exits.
pub trait Workload: Send {
    fn run(&mut self, stop: &StopSignal) -> u64;
}

/// One-way stop flag shared between a worker and its owner.
///
/// Raising it is idempotent and never blocks.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A named factory for fresh, independent workload instances.
#[derive(Clone, Copy)]
pub struct WorkloadSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub factory: fn() -> Box<dyn Workload>,
}

impl WorkloadSpec {
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn Workload> {
        (self.factory)()
    }
}

impl fmt::Debug for WorkloadSpec {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("WorkloadSpec")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Display for WorkloadSpec {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:<24}{}", self.name, self.description)
    }
}

/// Every known workload, in report order.
pub static REGISTRY: &[WorkloadSpec] = &[
    WorkloadSpec {
        name: "for-loop",
        description: "plain counter increment (CPU)",
        factory: || Box::new(ForLoop::new()),
    },
    WorkloadSpec {
        name: "factorial",
        description: "factorial over a rotating 10..=19 (CPU)",
        factory: || Box::new(Factorial::new()),
    },
    WorkloadSpec {
        name: "hash-sha",
        description: "hex SHA-512 of a fixed input (CPU)",
        factory: || Box::new(HashSha::new()),
    },
    WorkloadSpec {
        name: "matrix-creation",
        description: "fixed-size random matrix fill (memory)",
        factory: || Box::new(MatrixCreate::new()),
    },
    WorkloadSpec {
        name: "matrix-creation-growing",
        description: "random matrix fill, size grows each iteration (memory)",
        factory: || Box::new(MatrixCreateGrowing::new()),
    },
    WorkloadSpec {
        name: "matrix-solve",
        description: "dense matrix inversion (CPU/memory)",
        factory: || Box::new(MatrixSolve::new()),
    },
    WorkloadSpec {
        name: "string-concat",
        description: "unbounded string rebuild, pathological worst case (allocator)",
        factory: || Box::new(StringConcat::new()),
    },
];

#[must_use]
pub fn lookup(name: &str) -> Option<&'static WorkloadSpec> {
    REGISTRY.iter().find(|spec| spec.name == name)
}

/// Resolve the active workload set: `includes` (all when empty) minus
/// `excludes`, in registry order. Unknown names are rejected.
pub fn select(includes: &[String], excludes: &[String]) -> Result<Vec<&'static WorkloadSpec>> {
    for name in includes.iter().chain(excludes) {
        if lookup(name).is_none() {
            return Err(Error::Config(format!(
                "unknown workload '{name}', expected one of: {}",
                REGISTRY
                    .iter()
                    .map(|spec| spec.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }

    let includes: HashSet<&str> = includes.iter().map(String::as_str).collect();
    let excludes: HashSet<&str> = excludes.iter().map(String::as_str).collect();

    Ok(REGISTRY
        .iter()
        .filter(|spec| includes.is_empty() || includes.contains(spec.name))
        .filter(|spec| !excludes.contains(spec.name))
        .collect())
}
