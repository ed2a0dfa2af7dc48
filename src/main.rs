use clap::Parser;
use clockrate::cli::{Cli, Configuration};
use clockrate::driver::Driver;
use clockrate::machine::{MachineInfo, SystemCores};
use clockrate::report::Report;
use clockrate::workload::REGISTRY;
use log::{error, info, LevelFilter};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let args = Cli::parse();

    if args.list {
        for spec in REGISTRY {
            println!("{spec}");
        }
        return ExitCode::SUCCESS;
    }

    let level = if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
    {
        eprintln!("failed to initialise logging: {e}");
    }

    let configuration = match Configuration::from_cli(args) {
        Ok(configuration) => configuration,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    info!("* * *  C L O C K R A T E  * * *");
    let start_time = Instant::now();
    let results = Driver::new(&configuration).run();
    info!("Measurement took {:.1}s", start_time.elapsed().as_secs_f64());

    info!("Getting node info");
    let machine = MachineInfo::collect(&SystemCores::new());

    let report = Report::new(&configuration, &machine, &results);
    if let Err(e) = report.write(&configuration.output) {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    info!("Report written to {}", configuration.output.display());

    if !configuration.quiet {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => error!("{e}"),
        }
    }
    ExitCode::SUCCESS
}
