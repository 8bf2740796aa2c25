// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the init and serve subcommands.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kiosk")]
#[command(about = "Control plane for provisioning static websites as public storage buckets")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new kiosk.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Run the control-plane HTTP server
    Serve {
        /// Listen address override
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
}
