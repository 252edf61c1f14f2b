//! CLI module for the subscription gateway
//!
//! A single `serve` subcommand runs the HTTP API with the background
//! expiration sweep.

pub mod serve;

use clap::{Parser, Subcommand};

/// Subscription Gateway - issue, validate and retire time-bounded access keys
#[derive(Parser)]
#[command(name = "subscription-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve,
}
