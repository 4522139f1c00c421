use std::process;

use clap::{Parser, Subcommand};
use slog::error;

mod api;
mod command_handlers;
mod config;
mod db;
mod download;
mod error;
mod models;
mod shazam;
mod utils;
mod wav;

use config::Config;

#[derive(Parser)]
#[command(name = "seek-tune-rs", about = "Audio fingerprinting and identification")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify an audio clip against the landmark index
    Find { path: String },
    /// Resolve a Spotify track/album/playlist url, download and ingest it
    Download { spotify_url: String },
    /// Fingerprint a local audio file or directory of files
    Save {
        #[arg(short, long)]
        force: bool,
        path: String,
    },
    /// Delete the landmark index ("db"), or also empty songs/recordings ("all")
    Erase {
        #[arg(default_value = "db")]
        scope: String,
    },
    /// Start the HTTP API server
    Serve {
        #[arg(long, default_value = "http")]
        proto: String,
        #[arg(long, default_value_t = 5000)]
        port: u16,
    },
}

fn main() {
    let cfg = Config::from_env();
    let logger = utils::get_logger();

    for dir in [&cfg.tmp_dir, &cfg.songs_dir, &cfg.recordings_dir] {
        if let Err(e) = utils::create_folder(&dir.to_string_lossy()) {
            error!(logger, "failed to create directory"; "path" => dir.display().to_string(), "error" => e.to_string());
        }
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Find { path } => command_handlers::find(&path, &cfg),
        Commands::Download { spotify_url } => command_handlers::download(&spotify_url, &cfg),
        Commands::Save { force, path } => command_handlers::save(&path, force, &cfg),
        Commands::Erase { scope } => command_handlers::erase(&scope, &cfg),
        Commands::Serve { proto, port } => {
            let rt = tokio::runtime::Runtime::new().expect("failed to start async runtime");
            if let Err(e) = rt.block_on(api::start_server(&proto, port, cfg)) {
                error!(logger, "server exited with error"; "error" => e.to_string());
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }
}
