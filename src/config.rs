use std::path::PathBuf;

use crate::utils;

/// Immutable startup configuration. Built once via [`Config::from_env`] and
/// threaded by reference or clone into every component; never patched at
/// runtime and never read through a global.
#[derive(Debug, Clone)]
pub struct Config {
    // Spectrogram / peak picker / hasher parameters (§4.1-4.3). Changing any
    // of these invalidates every hash already stored in the index.
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop: usize,
    pub neighborhood_radius: usize,
    pub percentile: f64,
    pub fan_value: usize,
    pub min_dt: i64,
    pub max_dt: i64,

    // Landmark index backend selection.
    pub db_type: String,
    pub db_file: PathBuf,
    pub db_host: String,
    pub db_user: String,
    pub db_pass: String,
    pub db_name: String,
    pub db_port: String,

    // Spotify / download collaborators.
    pub spotify_client_id: String,
    pub spotify_client_secret: String,

    // HTTP surface defaults.
    pub http_proto: String,
    pub http_port: u16,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,

    // Persisted state directories.
    pub songs_dir: PathBuf,
    pub recordings_dir: PathBuf,
    pub tmp_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            sample_rate: 22050,
            n_fft: 2048,
            hop: 512,
            neighborhood_radius: 10,
            percentile: 98.0,
            fan_value: 10,
            min_dt: 1,
            max_dt: 200,

            db_type: utils::get_env("DB_TYPE", Some("sqlite")),
            db_file: PathBuf::from(utils::get_env("DB_FILE", Some("db/seek_tune.db"))),
            db_host: utils::get_env("DB_HOST", Some("localhost")),
            db_user: utils::get_env("DB_USER", None),
            db_pass: utils::get_env("DB_PASS", None),
            db_name: utils::get_env("DB_NAME", Some("seek_tune")),
            db_port: utils::get_env("DB_PORT", Some("27017")),

            spotify_client_id: utils::get_env("SPOTIFY_CLIENT_ID", None),
            spotify_client_secret: utils::get_env("SPOTIFY_CLIENT_SECRET", None),

            http_proto: utils::get_env("PROTO", Some("http")),
            http_port: utils::get_env("PORT", Some("5000")).parse().unwrap_or(5000),
            tls_cert: std::env::var("TLS_CERT").ok(),
            tls_key: std::env::var("TLS_KEY").ok(),

            songs_dir: PathBuf::from("songs"),
            recordings_dir: PathBuf::from("recordings"),
            tmp_dir: PathBuf::from("tmp"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_env()
    }
}
