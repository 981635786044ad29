use anyhow::Result;
use clap::Parser;
use std::io;
use std::process::ExitCode;

use haupdown::cli::{down_service, print_all_down, print_status, up_service, Cli, Commands};
use haupdown::spool::Spool;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Every command asks for write access up front; each invocation performs
    // exactly one operation against the spool and exits.
    let mut spool = Spool::configure(&cli.spool_root, true)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Up { service } => {
            up_service(&mut spool, &service)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Down { service, reason } => {
            down_service(&mut spool, &service, &reason)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { service } => {
            let is_up = print_status(&spool, &service, &mut out)?;
            if is_up {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
        Commands::StatusAll => {
            print_all_down(&spool, &mut out)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
