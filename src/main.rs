use std::path::PathBuf;

use clap::Parser;

mod harness;

#[derive(Parser, Debug)]
#[command(name = "tessera", about = "Tile framework demo harness")]
struct Args {
    /// Tile definition file to load.
    #[arg(long, default_value = "tiles.toml")]
    config: PathBuf,

    /// Scheduled updates to run per placed tile.
    #[arg(long, default_value_t = 400)]
    ticks: u32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(err) = harness::run(&args.config, args.ticks) {
        log::error!(target: "harness", "run failed: {err}");
        std::process::exit(1);
    }
}
