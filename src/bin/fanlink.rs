use clap::Parser;
use eyre::Result;

use fanlink::cli::CliOpts;

fn main() -> Result<()> {
    let opts = CliOpts::parse();

    fanlink::init()?;
    fanlink::cli(opts)
}
