//! CLI argument parsing for the homecare-route-worker binary.

use clap::{Parser, Subcommand};

use crate::types::TravelMode;

#[derive(Parser)]
#[command(name = "homecare-route-worker", about = "Daily route and travel-time worker for home-care staff")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Compute one worker's route for a day and print it as JSON
    Compute {
        /// Worker id (UUID)
        #[arg(long)]
        worker_id: String,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// DRIVING, WALKING or TRANSIT
        #[arg(long, default_value = "DRIVING")]
        mode: TravelMode,
        /// Worker's starting address, adds a leg to the first visit
        #[arg(long)]
        origin: Option<String>,
    },
}
