use rescache_core::logging;

mod cli;

use crate::cli::CliCommand;

fn main() {
    // File logging under the XDG state dir; stderr when that is not writable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = CliCommand::run_from_args() {
        eprintln!("rescache error: {:#}", err);
        std::process::exit(1);
    }
}
