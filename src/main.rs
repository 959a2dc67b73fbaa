use clap::Parser;
use log::error;

use chainsim::config::{Cli, SimConfig};
use chainsim::driver;

fn main() {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let cfg = match SimConfig::from_cli(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("invalid configuration: {err}");
            eprintln!("{err}\n{}", chainsim::config::usage());
            std::process::exit(1);
        }
    };

    if let Err(err) = driver::run_simulation(&cfg) {
        error!("simulation failed: {err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}
