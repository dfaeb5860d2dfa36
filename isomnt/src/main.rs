use clap::Parser;
use isomnt::cli::{self, Cli};
use isomnt_hal::LinuxHal;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match cli::usage_reason(&err) {
            None => {
                let _ = err.print();
                return ExitCode::SUCCESS;
            }
            Some(reason) => {
                println!("{reason}");
                print!("{}", cli::usage());
                return ExitCode::FAILURE;
            }
        },
    };
    isomnt::logging::init(cli.verbose);

    match isomnt::run(&cli, &LinuxHal::new()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            isomnt::errors::report(&err);
            ExitCode::FAILURE
        }
    }
}
