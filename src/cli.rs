use crate::driver::Plan;
use crate::error::{Error, Result};
use crate::machine::{CoreCount, SystemCores};
use crate::workload::{self, WorkloadSpec};
use ::clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REPORT_PATH: &str = "node_test.json";
pub const DEFAULT_GRACE_MILLIS: u64 = 250;

/// Validated run configuration, built once at startup and passed down
/// explicitly.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub workloads: Vec<&'static WorkloadSpec>,
    pub plan: Plan,
    /// Presentation only: lower log level and don't echo the report
    pub quiet: bool,
    /// Presentation only: format value/performance as e.g. "12.35 M"
    pub human_readable: bool,
    pub output: PathBuf,
}

impl Configuration {
    /// Validate the measurement settings and resolve workload names. Nothing
    /// has been started when this fails.
    ///
    /// # Arguments
    /// * `worker_counts` - `None` for 1..=logical cores
    pub fn new(
        includes: &[String],
        excludes: &[String],
        worker_counts: Option<Vec<usize>>,
        tries: u32,
        duration_secs: f64,
        grace: Duration,
    ) -> Result<Self> {
        if tries == 0 {
            return Err(Error::Config(String::from(
                "number of tries must be a positive integer",
            )));
        }
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return Err(Error::Config(format!(
                "duration must be a positive number of seconds, got {duration_secs}"
            )));
        }
        let duration = Duration::try_from_secs_f64(duration_secs).map_err(|e| {
            Error::Config(format!("duration of {duration_secs} seconds is unusable: {e}"))
        })?;
        if grace.is_zero() {
            return Err(Error::Config(String::from(
                "grace period must be at least one millisecond",
            )));
        }

        let worker_counts =
            worker_counts.unwrap_or_else(|| default_worker_counts(&SystemCores::new()));
        if worker_counts.is_empty() || worker_counts.contains(&0) {
            return Err(Error::Config(format!(
                "process counts must be positive, got {worker_counts:?}"
            )));
        }

        let workloads = workload::select(includes, excludes)?;
        if workloads.is_empty() {
            return Err(Error::Config(String::from(
                "every workload has been excluded",
            )));
        }

        Ok(Self {
            workloads,
            plan: Plan {
                worker_counts,
                tries,
                duration,
                grace,
            },
            quiet: false,
            human_readable: false,
            output: PathBuf::from(DEFAULT_REPORT_PATH),
        })
    }

    pub fn from_cli(args: Cli) -> Result<Self> {
        let worker_counts = if args.processes.is_empty() {
            None
        } else {
            Some(args.processes)
        };
        let mut configuration = Self::new(
            &args.includes,
            &args.excludes,
            worker_counts,
            args.tries,
            args.duration,
            Duration::from_millis(args.grace),
        )?;
        configuration.quiet = args.quiet;
        configuration.human_readable = args.human;
        configuration.output = args.output;
        Ok(configuration)
    }
}

/// 1, 2, ... up to the number of logical cores.
#[must_use]
pub fn default_worker_counts(cores: &dyn CoreCount) -> Vec<usize> {
    (1..=cores.logical().max(1)).collect()
}

/*
  >>> ATTENTION <<<

    When updating this structure, you probably want to update
    Configuration::from_cli too.
*/

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(
        long = "include",
        short = 'i',
        value_name = "TESTNAME",
        help = "Turn on specific tests, by default all tests are included"
    )]
    pub includes: Vec<String>,
    #[arg(
        long = "exclude",
        short = 'x',
        value_name = "TESTNAME",
        help = "Turn off specific tests"
    )]
    pub excludes: Vec<String>,
    #[arg(
        long,
        short,
        default_value_t = 0.3,
        value_name = "SECONDS",
        help = "Duration of each trial"
    )]
    pub duration: f64,
    #[arg(
        long,
        short,
        default_value_t = 5,
        value_name = "TRIES",
        help = "Number of trials for each process count"
    )]
    pub tries: u32,
    #[arg(
        long,
        short,
        value_delimiter = ',',
        value_name = "COUNTS",
        help = "Comma separated process counts to test [default: 1 up to the logical core count]"
    )]
    pub processes: Vec<usize>,
    #[arg(
        long,
        short,
        default_value_t = DEFAULT_GRACE_MILLIS,
        value_name = "MILLIS",
        help = "How long to wait for a signalled worker before giving up on it"
    )]
    pub grace: u64,
    #[arg(
        long,
        short,
        default_value = DEFAULT_REPORT_PATH,
        value_name = "PATH",
        help = "Where to write the JSON report"
    )]
    pub output: PathBuf,
    #[arg(long, short, help = "Only log warnings and do not print the report")]
    pub quiet: bool,
    #[arg(
        long,
        short = 'H',
        help = "Write value and performance in human readable form (k, M, G)"
    )]
    pub human: bool,
    #[arg(long, help = "List the available tests and exit")]
    pub list: bool,
}
