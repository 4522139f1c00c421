use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT_LANGUAGE;
use serde_json::Value;

use crate::error::EngineError;
use crate::models::Track;

const DURATION_MATCH_THRESHOLD_SECS: i64 = 5;

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub title: String,
    pub uploader: String,
    pub url: String,
    pub duration: String,
    pub id: String,
    pub live: bool,
}

fn duration_str_to_seconds(duration_str: &str) -> i64 {
    duration_str
        .split(':')
        .fold(0i64, |acc, part| acc * 60 + part.parse::<i64>().unwrap_or(0))
}

/// Audio retrieval collaborator (§6): "given a free-text query returns the
/// path to a downloaded audio file plus a canonical source URL". This half
/// resolves the query to a video id by scraping YouTube's search results
/// page and picking the first hit whose duration is within
/// `DURATION_MATCH_THRESHOLD_SECS` of the Spotify track; the actual download
/// is left to `downloader::fetch_audio`, which shells out to `yt-dlp`.
pub fn get_youtube_id(track: &Track) -> Result<String, EngineError> {
    let target_secs = track.duration_ms / 1000;
    let query = format!("{} {}", track.title, track.artist);
    let results = search(&query, 10)?;
    if results.is_empty() {
        return Err(EngineError::ExternalApi(format!("no results for '{}'", query)));
    }
    results
        .into_iter()
        .find(|r| !r.live && (duration_str_to_seconds(&r.duration) - target_secs).abs() <= DURATION_MATCH_THRESHOLD_SECS)
        .map(|r| r.id)
        .ok_or_else(|| EngineError::ExternalApi(format!("no duration-matching result for '{}'", query)))
}

/// Scrapes `youtube.com/results` and parses the `ytInitialData` blob embedded
/// in the page for up to `limit` video results.
pub fn search(search_term: &str, limit: usize) -> Result<Vec<SearchResult>, EngineError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| EngineError::ExternalApi(format!("building http client: {}", e)))?;

    let search_url = format!(
        "https://www.youtube.com/results?search_query={}",
        url::form_urlencoded::byte_serialize(search_term.as_bytes()).collect::<String>()
    );
    let body = client
        .get(&search_url)
        .header(ACCEPT_LANGUAGE, "en")
        .send()
        .map_err(|e| EngineError::ExternalApi(format!("youtube search request: {}", e)))?
        .text()
        .map_err(|e| EngineError::ExternalApi(format!("youtube search body: {}", e)))?;

    let json_data = extract_initial_data(&body)?;
    let data: Value = serde_json::from_str(json_data)
        .map_err(|e| EngineError::ExternalApi(format!("youtube search json: {}", e)))?;

    let sections = data
        .pointer("/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents")
        .and_then(|v| v.as_array())
        .ok_or_else(|| EngineError::ExternalApi("unexpected youtube search response shape".into()))?;

    let mut results = Vec::new();
    'sections: for section in sections {
        let Some(contents) = section
            .pointer("/itemSectionRenderer/contents")
            .and_then(|v| v.as_array())
        else {
            continue;
        };
        for item in contents {
            let Some(video) = item.get("videoRenderer") else { continue };
            let Some(video_id) = video.get("videoId").and_then(|v| v.as_str()) else { continue };

            let title = video.pointer("/title/runs/0/text").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let uploader = video.pointer("/ownerText/runs/0/text").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let (duration, live) = match video.pointer("/lengthText/simpleText").and_then(|v| v.as_str()) {
                Some(d) => (d.to_string(), false),
                None => (String::new(), true),
            };

            results.push(SearchResult {
                title,
                uploader,
                duration,
                id: video_id.to_string(),
                url: format!("https://youtube.com/watch?v={}", video_id),
                live,
            });
            if results.len() >= limit {
                break 'sections;
            }
        }
    }
    Ok(results)
}

fn extract_initial_data(body: &str) -> Result<&str, EngineError> {
    for marker in [r#"window["ytInitialData"] = "#, "var ytInitialData = "] {
        if let Some(idx) = body.find(marker) {
            let tail = &body[idx + marker.len()..];
            if let Some(end) = tail.find(";</script>") {
                return Ok(&tail[..end]);
            }
        }
    }
    Err(EngineError::ExternalApi("could not locate ytInitialData in response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hh_mm_ss_durations() {
        assert_eq!(duration_str_to_seconds("1:02:03"), 3723);
        assert_eq!(duration_str_to_seconds("3:21"), 201);
        assert_eq!(duration_str_to_seconds("45"), 45);
    }
}
