use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, App, Error, HttpResponse, HttpServer, Responder};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use slog::{error, info};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::db::LandmarkIndex;
use crate::download;
use crate::error::EngineError;
use crate::shazam;
use crate::utils;
use crate::wav;

struct AppState {
    cfg: Arc<Config>,
    index: Arc<dyn LandmarkIndex>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    detail: String,
}

impl ErrorResponse {
    fn of(e: EngineError) -> HttpResponse {
        HttpResponse::InternalServerError().json(ErrorResponse {
            status: "error",
            detail: e.to_string(),
        })
    }
}

#[derive(Serialize)]
struct SaveResponse {
    status: &'static str,
    song_id: u64,
    hashes: usize,
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    spotify_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    youtube_url: Option<String>,
}

#[derive(Serialize)]
struct Prediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    song_id: Option<u64>,
    title: String,
    artist: String,
    score: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    spotify_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    youtube_url: Option<String>,
}

#[derive(Serialize)]
struct FindResponse {
    status: &'static str,
    prediction: Prediction,
}

#[derive(Deserialize)]
struct DownloadRequest {
    spotify_url: Option<String>,
}

#[derive(Serialize)]
struct DownloadResponse {
    status: &'static str,
    song_id: u64,
    title: String,
    artist: String,
    hashes: usize,
    wav_path: String,
    spotify_url: String,
    youtube_url: String,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// Drains a multipart upload's `file` field into a temp file under
/// `cfg.tmp_dir`, returning its path and the client-supplied filename.
async fn save_upload(mut payload: Multipart, cfg: &Config) -> Result<(PathBuf, String), Error> {
    let _ = utils::create_folder(&cfg.tmp_dir.to_string_lossy());
    let mut temp_file = NamedTempFile::new_in(&cfg.tmp_dir).map_err(actix_web::error::ErrorInternalServerError)?;
    let mut filename = String::from("upload");

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(actix_web::error::ErrorInternalServerError)?;
        if let Some(cd) = field.content_disposition() {
            if let Some(fname) = cd.get_filename() {
                filename = fname.to_string();
            }
        }
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(actix_web::error::ErrorInternalServerError)?;
            temp_file
                .write_all(&data)
                .map_err(actix_web::error::ErrorInternalServerError)?;
        }
    }
    temp_file.flush().map_err(actix_web::error::ErrorInternalServerError)?;

    let (_file, path) = temp_file
        .keep()
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    let ext = PathBuf::from(&filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    let renamed = path.with_extension(if ext.is_empty() { "bin".to_string() } else { ext });
    std::fs::rename(&path, &renamed).map_err(actix_web::error::ErrorInternalServerError)?;

    Ok((renamed, filename))
}

async fn api_save(payload: Multipart, state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let (upload_path, filename) = save_upload(payload, &state.cfg).await?;
    let cfg = state.cfg.clone();
    let index = state.index.clone();

    let result = web::block(move || {
        let input = upload_path.to_string_lossy().into_owned();
        let title = PathBuf::from(&filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown Title")
            .to_string();
        let out = download::process_and_save_song(&input, &title, "Unknown Artist", None, None, index.as_ref(), &cfg);
        let _ = utils::delete_file(&input);
        out
    })
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    match result {
        Ok((song_id, hashes, _wav_path)) => Ok(HttpResponse::Ok().json(SaveResponse {
            status: "ok",
            song_id,
            hashes,
            filename,
            spotify_url: None,
            youtube_url: None,
        })),
        Err(e) => Ok(ErrorResponse::of(e)),
    }
}

async fn api_find(payload: Multipart, state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let (upload_path, _filename) = save_upload(payload, &state.cfg).await?;
    let cfg = state.cfg.clone();
    let index = state.index.clone();

    let result = web::block(move || {
        let input = upload_path.to_string_lossy().into_owned();
        let loaded = wav::load_samples(&input);
        let _ = utils::delete_file(&input);
        let (samples, sample_rate) = loaded?;
        shazam::identify(&samples, sample_rate, index.as_ref(), &cfg)
    })
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    match result {
        Ok(id) => Ok(HttpResponse::Ok().json(FindResponse {
            status: "ok",
            prediction: Prediction {
                song_id: id.song_id,
                title: id.title,
                artist: id.artist,
                score: id.score,
                spotify_url: id.spotify_url,
                youtube_url: id.youtube_url,
            },
        })),
        Err(e) => Ok(ErrorResponse::of(e)),
    }
}

async fn api_download(body: web::Json<DownloadRequest>, state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let Some(spotify_url) = body.spotify_url.clone() else {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            status: "error",
            detail: "spotify_url is required".to_string(),
        }));
    };

    let cfg = state.cfg.clone();
    let index = state.index.clone();
    let songs_dir = cfg.songs_dir.to_string_lossy().into_owned();

    let result = web::block(move || download::dl_single_track_info(&spotify_url, &songs_dir, &cfg, index.as_ref()))
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    match result {
        Ok(track) => Ok(HttpResponse::Ok().json(DownloadResponse {
            status: "ok",
            song_id: track.song_id,
            title: track.title,
            artist: track.artist,
            hashes: track.hashes,
            wav_path: track.wav_path,
            spotify_url: body.spotify_url.clone().unwrap_or_default(),
            youtube_url: track.youtube_url,
        })),
        Err(e) => Ok(ErrorResponse::of(e)),
    }
}

/// Builds the actix-web app and binds it to `proto://0.0.0.0:port`. `https`
/// requires `cfg.tls_cert`/`cfg.tls_key`; anything else is a startup error.
pub async fn start_server(proto: &str, port: u16, cfg: Config) -> std::io::Result<()> {
    let logger = utils::get_logger();
    let index: Arc<dyn LandmarkIndex> = Arc::from(crate::db::open_index(&cfg).map_err(std::io::Error::other)?);
    let cfg = Arc::new(cfg);

    let state = web::Data::new(AppState {
        cfg: cfg.clone(),
        index,
    });

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health))
            .route("/api/save", web::post().to(api_save))
            .route("/api/find", web::post().to(api_find))
            .route("/api/download", web::post().to(api_download))
    });

    match proto {
        "https" => {
            let (cert_path, key_path) = match (&cfg.tls_cert, &cfg.tls_key) {
                (Some(c), Some(k)) => (c.clone(), k.clone()),
                _ => {
                    return Err(std::io::Error::other(
                        "https requires TLS_CERT and TLS_KEY to be configured",
                    ))
                }
            };
            let tls_config = build_tls_config(&cert_path, &key_path)?;
            info!(logger, "starting server"; "proto" => "https", "port" => port);
            server.bind_rustls_0_23(("0.0.0.0", port), tls_config)?.run().await
        }
        "http" => {
            info!(logger, "starting server"; "proto" => "http", "port" => port);
            server.bind(("0.0.0.0", port))?.run().await
        }
        other => {
            error!(logger, "unsupported protocol"; "proto" => other);
            Err(std::io::Error::other(format!("unsupported protocol: {}", other)))
        }
    }
}

fn build_tls_config(cert_path: &str, key_path: &str) -> std::io::Result<rustls::ServerConfig> {
    let cert_file = &mut BufReader::new(File::open(cert_path)?);
    let key_file = &mut BufReader::new(File::open(key_path)?);

    let certs = rustls_pemfile::certs(cert_file).collect::<Result<Vec<_>, _>>()?;
    let key = rustls_pemfile::private_key(key_file)?
        .ok_or_else(|| std::io::Error::other(format!("no private key found in {}", key_path)))?;

    rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(std::io::Error::other)
}
