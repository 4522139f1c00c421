use std::thread;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use serde_json::Value;
use urlencoding::encode;

use crate::error::EngineError;
use crate::models::Track;

// Spotify collaborator (§6): "given a track URL returns
// {id, title, artist, album, duration_ms}". Spotify's public partner API
// (the same one open.spotify.com's web player calls) is used instead of the
// official OAuth Web API so that `download` needs no app registration, at
// the cost of depending on an undocumented, occasionally-reshaped surface.
const TOKEN_ENDPOINT: &str =
    "https://open.spotify.com/get_access_token?reason=transport&productType=web-player";
const TRACK_INITIAL_PATH: &str =
    "https://api-partner.spotify.com/pathfinder/v1/query?operationName=getTrack&variables=";
const PLAYLIST_INITIAL_PATH: &str =
    "https://api-partner.spotify.com/pathfinder/v1/query?operationName=fetchPlaylist&variables=";
const ALBUM_INITIAL_PATH: &str =
    "https://api-partner.spotify.com/pathfinder/v1/query?operationName=getAlbum&variables=";
const TRACK_END_PATH: &str = r#"{"persistedQuery":{"version":1,"sha256Hash":"e101aead6d78faa11d75bec5e36385a07b2f1c4a0420932d374d89ee17c70dd6"}}"#;
const PLAYLIST_END_PATH: &str = r#"{"persistedQuery":{"version":1,"sha256Hash":"b39f62e9b566aa849b1780927de1450f47e02c54abf1e66e513f96e849591e41"}}"#;
const ALBUM_END_PATH: &str = r#"{"persistedQuery":{"version":1,"sha256Hash":"46ae954ef2d2fe7732b4b2b4022157b2e18b7ea84f70591ceb164e4de1b5d5d3"}}"#;

const PAGE_SIZE: i64 = 400;

fn access_token() -> Result<String, EngineError> {
    let body = reqwest::blocking::get(TOKEN_ENDPOINT)
        .map_err(|e| EngineError::ExternalApi(format!("spotify token request: {}", e)))?
        .text()
        .map_err(|e| EngineError::ExternalApi(format!("spotify token body: {}", e)))?;
    let v: Value = serde_json::from_str(&body)
        .map_err(|e| EngineError::ExternalApi(format!("spotify token json: {}", e)))?;
    v.get("accessToken")
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| EngineError::ExternalApi("accessToken not found in response".into()))
}

fn request(endpoint: &str) -> Result<String, EngineError> {
    let bearer = access_token()?;
    let client = Client::new();
    let resp = client
        .get(endpoint)
        .header("Authorization", format!("Bearer {}", bearer))
        .send()
        .map_err(|e| EngineError::ExternalApi(format!("spotify request: {}", e)))?;
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .map_err(|e| EngineError::ExternalApi(format!("spotify response body: {}", e)))?;
    if status != 200 {
        return Err(EngineError::ExternalApi(format!(
            "spotify returned status {}",
            status
        )));
    }
    Ok(body)
}

fn get_id(url: &str) -> String {
    url.split('/')
        .nth(4)
        .and_then(|s| s.split('?').next())
        .unwrap_or("")
        .to_string()
}

fn is_valid_pattern(url: &str, pattern: &str) -> bool {
    Regex::new(pattern).map(|re| re.is_match(url)).unwrap_or(false)
}

fn encode_param(param: &str) -> String {
    encode(param).into_owned()
}

/// Resolves a single `open.spotify.com/track/...` URL to its track metadata.
pub fn track_info(url: &str) -> Result<Track, EngineError> {
    let track_pattern = r"^https://open\.spotify\.com/track/[a-zA-Z0-9]{22}(\?.*)?$";
    if !is_valid_pattern(url, track_pattern) {
        return Err(EngineError::ExternalApi("invalid Spotify track url".into()));
    }
    let id = get_id(url);
    let query = format!(r#"{{"uri":"spotify:track:{}"}}"#, id);
    let endpoint = format!(
        "{}{}&extensions={}",
        TRACK_INITIAL_PATH,
        encode_param(&query),
        encode_param(TRACK_END_PATH)
    );
    let body = request(&endpoint)?;
    let v: Value = serde_json::from_str(&body)
        .map_err(|e| EngineError::ExternalApi(format!("spotify track json: {}", e)))?;

    let duration_ms = v
        .pointer("/data/trackUnion/duration/totalMilliseconds")
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    Ok(Track {
        id,
        title: v
            .pointer("/data/trackUnion/name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        artist: v
            .pointer("/data/trackUnion/firstArtist/items/0/profile/name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        album: v
            .pointer("/data/trackUnion/albumOfTrack/name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        duration_ms,
    })
}

/// Resolves every track in a Spotify playlist, paginating `PAGE_SIZE` at a
/// time.
pub fn playlist_info(url: &str) -> Result<Vec<Track>, EngineError> {
    let pattern = r"^https://open\.spotify\.com/playlist/[a-zA-Z0-9]{22}(\?.*)?$";
    if !is_valid_pattern(url, pattern) {
        return Err(EngineError::ExternalApi("invalid Spotify playlist url".into()));
    }
    resource_tracks(url, "playlist")
}

/// Resolves every track on a Spotify album, paginating `PAGE_SIZE` at a time.
pub fn album_info(url: &str) -> Result<Vec<Track>, EngineError> {
    let pattern = r"^https://open\.spotify\.com/album/[a-zA-Z0-9]{22}(\?.*)?$";
    if !is_valid_pattern(url, pattern) {
        return Err(EngineError::ExternalApi("invalid Spotify album url".into()));
    }
    resource_tracks(url, "album")
}

fn resource_tracks(url: &str, resource_type: &str) -> Result<Vec<Track>, EngineError> {
    let id = get_id(url);
    let mut offset = 0i64;

    let first_page = fetch_page(resource_type, &id, offset, PAGE_SIZE)?;
    let total_count = total_count(&first_page, resource_type);
    if total_count < 1 {
        return Err(EngineError::ExternalApi("no tracks found".into()));
    }

    let mut tracks = extract_tracks(&first_page, resource_type);
    offset += PAGE_SIZE;
    while offset < total_count {
        thread::sleep(Duration::from_millis(200));
        let page = fetch_page(resource_type, &id, offset, PAGE_SIZE)?;
        tracks.extend(extract_tracks(&page, resource_type));
        offset += PAGE_SIZE;
    }
    Ok(tracks)
}

fn fetch_page(resource_type: &str, id: &str, offset: i64, limit: i64) -> Result<Value, EngineError> {
    let endpoint = if resource_type == "playlist" {
        let query = format!(r#"{{"uri":"spotify:playlist:{}","offset":{},"limit":{}}}"#, id, offset, limit);
        format!(
            "{}{}&extensions={}",
            PLAYLIST_INITIAL_PATH,
            encode_param(&query),
            encode_param(PLAYLIST_END_PATH)
        )
    } else {
        let query = format!(
            r#"{{"uri":"spotify:album:{}","locale":"","offset":{},"limit":{}}}"#,
            id, offset, limit
        );
        format!(
            "{}{}&extensions={}",
            ALBUM_INITIAL_PATH,
            encode_param(&query),
            encode_param(ALBUM_END_PATH)
        )
    };
    let body = request(&endpoint)?;
    serde_json::from_str(&body).map_err(|e| EngineError::ExternalApi(format!("spotify page json: {}", e)))
}

fn total_count(page: &Value, resource_type: &str) -> i64 {
    let pointer = if resource_type == "playlist" {
        "/data/playlistV2/content/totalCount"
    } else {
        "/data/albumUnion/tracks/totalCount"
    };
    page.pointer(pointer).and_then(|v| v.as_i64()).unwrap_or(0)
}

fn extract_tracks(page: &Value, resource_type: &str) -> Vec<Track> {
    let (item_list, title_ptr, artist_ptr, duration_ptr) = if resource_type == "playlist" {
        (
            "/data/playlistV2/content/items",
            "/itemV2/data/name",
            "/itemV2/data/artists/items/0/profile/name",
            "/itemV2/data/trackDuration/totalMilliseconds",
        )
    } else {
        (
            "/data/albumUnion/tracks/items",
            "/track/name",
            "/track/artists/items/0/profile/name",
            "/track/duration/totalMilliseconds",
        )
    };
    let album = page
        .pointer("/data/albumUnion/name")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let empty = Vec::new();
    let items = page.pointer(item_list).and_then(|v| v.as_array()).unwrap_or(&empty);
    items
        .iter()
        .map(|item| Track {
            id: String::new(),
            title: item.pointer(title_ptr).and_then(|v| v.as_str()).unwrap_or("").to_string(),
            artist: item.pointer(artist_ptr).and_then(|v| v.as_str()).unwrap_or("").to_string(),
            album: album.clone(),
            duration_ms: item.pointer(duration_ptr).and_then(|v| v.as_i64()).unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_id_extracted_from_url() {
        assert_eq!(
            get_id("https://open.spotify.com/track/4cOdK2wGLETKBW3PvgPWqT?si=abc"),
            "4cOdK2wGLETKBW3PvgPWqT"
        );
    }

    #[test]
    fn rejects_malformed_track_url() {
        let err = track_info("https://example.com/not-spotify").unwrap_err();
        assert!(matches!(err, EngineError::ExternalApi(_)));
    }
}
