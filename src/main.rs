mod args;
mod cdf;

use clap::Parser;
use log::{debug, info};
use snafu::ErrorCompat;

use crate::args::Args;
use crate::cdf::{run_batch, BatchSettings};

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    debug!("args: {:?}", args);

    let settings = BatchSettings::from(&args);
    match run_batch(&settings) {
        Ok(count) => {
            info!("{} documents created on {}", count, settings.output_dir);
        }
        Err(e) => {
            eprintln!("An error occured: {}", e);
            let mut cause = std::error::Error::source(&e);
            while let Some(c) = cause {
                eprintln!("  caused by: {}", c);
                cause = c.source();
            }
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("trace: {}", bt);
            }
            std::process::exit(1);
        }
    }
}
