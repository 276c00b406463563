// src/main.rs

use std::io;
use std::process::ExitCode;

use log::error;

use debugtree::config::InspectConfig;
use debugtree::error::TreeError;
use debugtree::inspect::Inspector;

fn main() -> ExitCode {
    env_logger::init();

    let config = match InspectConfig::from_args(std::env::args()) {
        Ok(config) => config,
        Err(TreeError::Usage(msg)) => {
            println!("{}", msg);
            return ExitCode::from(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let mut inspector = match Inspector::open(config) {
        Ok(inspector) => inspector,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match inspector.scan(&mut out) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
