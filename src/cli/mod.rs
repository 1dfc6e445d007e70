use clap::{Parser, Subcommand};
use eyre::Result;

use crate::hardware::fan::defs::PowerState;

mod config;
mod list;
mod serve;
mod set;

#[derive(Parser)]
#[command(version, about)]
pub struct CliOpts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the configuration and print the device registry
    Config {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },

    /// List devices with their identity and cache status
    List {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },

    /// Send a single power command to one or more devices
    Set {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
        /// Power state to send, `on` or `off`
        state: PowerState,
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// Expose the devices over HTTP until interrupted
    Serve {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
pub async fn execute(opts: CliOpts) -> Result<()> {
    match opts.command {
        Command::Config { config } => self::config::read_and_print(&config).await,
        Command::List { config } => self::list::print_devices(&config).await,
        Command::Set {
            config,
            state,
            devices,
        } => self::set::send(&config, state, &devices).await,
        Command::Serve { config, port } => self::serve::launch(&config, port).await,
    }
}
