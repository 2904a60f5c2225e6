//! Command-line interface for crosses.

use clap::Parser;

/// Crosses - multiplayer noughts-and-crosses server
#[derive(Parser, Debug)]
#[command(name = "crosses")]
#[command(about = "Multiplayer noughts-and-crosses server with live board updates", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    pub port: u16,
}
