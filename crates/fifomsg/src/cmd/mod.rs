use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod doctor;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one or more messages into a named pipe.
    Send(SendArgs),
    /// Listen on a named pipe and print received messages.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// FIFO path (created if missing).
    pub path: PathBuf,
    /// Message identifier.
    #[arg(long, default_value = fifomsg_frame::DEFAULT_IDENTIFIER)]
    pub id: String,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Number of messages to send.
    #[arg(long, default_value_t = 1)]
    pub count: usize,
    /// Pause between messages (e.g. 1s, 250ms).
    #[arg(long)]
    pub interval: Option<String>,
    /// Append " <index>" to each payload.
    #[arg(long)]
    pub numbered: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// FIFO path (created if missing).
    pub path: PathBuf,
    /// Identifier to print (repeatable). Default: NAMEDPIPE.
    #[arg(long = "id", value_name = "ID")]
    pub ids: Vec<String>,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit after this long (e.g. 10s, 500ms).
    #[arg(long)]
    pub duration: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}
