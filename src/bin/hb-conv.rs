use std::process;

use clap::Parser;
use clap::error::ErrorKind;
use hb_conv_core::cli::{self, Cli};

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder
        .format_timestamp(None)
        .target(env_logger::Target::Stderr);
    if verbose {
        builder.filter_module("hb_conv", log::LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    init_logging(cli.verbose);

    match cli::run(&cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(1);
        }
    }
}
