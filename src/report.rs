use crate::cli::Configuration;
use crate::driver::series::WorkerCountSummary;
use crate::driver::BenchmarkResult;
use crate::error::Result;
use crate::machine::MachineInfo;
use chrono::{Local, SecondsFormat};
use log::trace;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A number as written to the report: raw, or pre-formatted for people.
/// NaN serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Raw(f64),
    Human(String),
}

impl Number {
    fn new(value: f64, human_readable: bool) -> Self {
        if human_readable && value.is_finite() {
            Number::Human(human_format(value))
        } else {
            Number::Raw(value)
        }
    }
}

/// `1234567.0` -> `"1.23 M"`. Values under a thousand keep two decimals and
/// no suffix.
#[must_use]
pub fn human_format(value: f64) -> String {
    const SUFFIXES: [&str; 5] = ["", " k", " M", " G", " T"];
    let mut scaled = value;
    let mut index = 0;
    while scaled.abs() >= 1000.0 && index < SUFFIXES.len() - 1 {
        scaled /= 1000.0;
        index += 1;
    }
    format!("{scaled:.2}{}", SUFFIXES[index])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub processes: usize,
    pub exit: bool,
    pub duration: f64,
    pub value: Number,
    pub performance: Number,
}

impl ReportEntry {
    fn new(summary: &WorkerCountSummary, human_readable: bool) -> Self {
        Self {
            processes: summary.workers,
            exit: summary.clean,
            duration: summary.avg_duration,
            value: Number::new(summary.avg_score, human_readable),
            performance: Number::new(summary.throughput, human_readable),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportConfiguration {
    pub tests: Vec<&'static str>,
    pub processes: Vec<usize>,
    pub tries: u32,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report<'a> {
    pub created: String,
    pub configuration: ReportConfiguration,
    pub architecture: &'a MachineInfo,
    pub results: BTreeMap<&'a str, Vec<ReportEntry>>,
}

impl<'a> Report<'a> {
    #[must_use]
    pub fn new(
        configuration: &Configuration,
        architecture: &'a MachineInfo,
        results: &'a BenchmarkResult,
    ) -> Self {
        let results = results
            .iter()
            .map(|(name, summaries)| {
                let entries = summaries
                    .iter()
                    .map(|summary| ReportEntry::new(summary, configuration.human_readable))
                    .collect();
                (name.as_str(), entries)
            })
            .collect();

        Self {
            created: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            configuration: ReportConfiguration {
                tests: configuration.workloads.iter().map(|spec| spec.name).collect(),
                processes: configuration.plan.worker_counts.clone(),
                tries: configuration.plan.tries,
                duration: configuration.plan.duration.as_secs_f64(),
            },
            architecture,
            results,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        trace!("Writing report to: {path:?}");
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
